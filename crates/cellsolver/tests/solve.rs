use cellsolver::{Params, PowerDiagramSolver, Problem, SolveError};
use geo::{Area, BooleanOps, Centroid, Coord, LineString, Polygon};

fn rect(w: f64, h: f64) -> Vec<Coord<f64>> {
    vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: w, y: 0.0 },
        Coord { x: w, y: h },
        Coord { x: 0.0, y: h },
        Coord { x: 0.0, y: 0.0 },
    ]
}

/// `nx` × `ny` jittered grid of sites inside `[0, w] × [0, h]`, labelled
/// round-robin over `rooms` rooms.
fn grid(w: f64, h: f64, nx: usize, ny: usize, rooms: usize) -> (Vec<Coord<f64>>, Vec<usize>) {
    let mut sites = Vec::new();
    let mut labels = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            let jitter = 0.05 * (((i * 7 + j * 13) % 5) as f64 - 2.0);
            sites.push(Coord {
                x: w * (i as f64 + 0.5 + jitter * 0.5) / nx as f64,
                y: h * (j as f64 + 0.5 - jitter * 0.5) / ny as f64,
            });
            labels.push(sites.len() % rooms);
        }
    }
    (sites, labels)
}

fn problem(boundary: Vec<Coord<f64>>, sites: Vec<Coord<f64>>, site_room: Vec<usize>, room_area: Vec<f64>) -> Problem {
    Problem { boundary, holes: vec![], sites, site_room, site_fixed: vec![], room_area, room_links: vec![] }
}

/// Area-weighted centroid of the cells of `room`.
fn room_centroid(mesh: &cellsolver::CellMesh, site_room: &[usize], room: usize) -> Coord<f64> {
    let (mut area, mut x, mut y) = (0.0, 0.0, 0.0);
    for c in (0..mesh.num_cells()).filter(|&c| site_room[mesh.cell2site[c]] == room) {
        let polygon = mesh.cell_polygon(c);
        let (a, p) = (polygon.unsigned_area(), polygon.centroid().unwrap());
        area += a;
        x += a * p.x();
        y += a * p.y();
    }
    Coord { x: x / area, y: y / area }
}

#[test]
fn two_equal_rooms_in_a_square() {
    let (sites, labels) = grid(1.0, 1.0, 4, 4, 2);
    let mesh = PowerDiagramSolver::default().solve(&problem(rect(1.0, 1.0), sites, labels, vec![1.0, 1.0])).unwrap();

    assert_eq!(mesh.room_area.len(), 2);
    for area in &mesh.room_area {
        assert!((area - 0.5).abs() < 0.05, "room area {area}");
    }
    assert!(!mesh.wall2vtx.is_empty());

    let covered: f64 = (0..mesh.num_cells()).map(|c| mesh.cell_polygon(c).unsigned_area()).sum();
    assert!((covered - 1.0).abs() < 1e-6, "covered {covered}");
}

#[test]
fn unequal_rooms_in_a_rectangle() {
    let (sites, labels) = grid(2.0, 1.0, 6, 3, 3);
    let targets = [0.5, 0.3, 0.2];
    let mesh = PowerDiagramSolver::default()
        .solve(&problem(rect(2.0, 1.0), sites, labels, targets.to_vec()))
        .unwrap();

    for (area, share) in mesh.room_area.iter().zip(targets) {
        let target = 2.0 * share;
        assert!((area - target).abs() < 0.1 * target, "room area {area}, target {target}");
    }
}

#[test]
fn cells_tile_a_concave_boundary() {
    let boundary = vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 1.0, y: 0.0 },
        Coord { x: 1.0, y: 0.4 },
        Coord { x: 0.4, y: 0.4 },
        Coord { x: 0.4, y: 1.0 },
        Coord { x: 0.0, y: 1.0 },
    ];
    let sites = vec![
        Coord { x: 0.2, y: 0.2 },
        Coord { x: 0.8, y: 0.2 },
        Coord { x: 0.2, y: 0.8 },
        Coord { x: 0.5, y: 0.2 },
        Coord { x: 0.2, y: 0.5 },
    ];
    let mesh = PowerDiagramSolver::default()
        .solve(&problem(boundary, sites, vec![0, 1, 1, 0, 0], vec![1.0, 1.0]))
        .unwrap();

    let covered: f64 = (0..mesh.num_cells()).map(|c| mesh.cell_polygon(c).unsigned_area()).sum();
    assert!((covered - 0.64).abs() < 1e-6, "covered {covered}");
    assert!(mesh.cell2site.iter().all(|&s| s < 5));
}

#[test]
fn site_labels_decide_the_layout() {
    let (sites, labels) = grid(1.0, 1.0, 4, 4, 2);
    let swapped: Vec<usize> = labels.iter().map(|&r| 1 - r).collect();
    let solver = PowerDiagramSolver::default();
    let a = solver.solve(&problem(rect(1.0, 1.0), sites.clone(), labels.clone(), vec![1.0, 1.0])).unwrap();
    let b = solver.solve(&problem(rect(1.0, 1.0), sites, swapped.clone(), vec![1.0, 1.0])).unwrap();

    let (ca, cb) = (room_centroid(&a, &labels, 0), room_centroid(&b, &swapped, 0));
    let apart = ((ca.x - cb.x).powi(2) + (ca.y - cb.y).powi(2)).sqrt();
    assert!(apart > 0.2, "room 0 at {ca:?} and {cb:?}");
}

#[test]
fn holes_stay_empty() {
    let (sites, labels) = grid(1.0, 1.0, 4, 4, 2);
    let hole = vec![
        Coord { x: 0.3, y: 0.3 },
        Coord { x: 0.3, y: 0.7 },
        Coord { x: 0.7, y: 0.7 },
        Coord { x: 0.7, y: 0.3 },
    ];
    let mut p = problem(rect(1.0, 1.0), sites, labels, vec![1.0, 1.0]);
    p.holes = vec![hole.clone()];
    let mesh = PowerDiagramSolver::default().solve(&p).unwrap();

    let covered: f64 = (0..mesh.num_cells()).map(|c| mesh.cell_polygon(c).unsigned_area()).sum();
    assert!((covered - 0.84).abs() < 1e-6, "covered {covered}");
    let hole = Polygon::new(LineString::from(hole), vec![]);
    let overlap: f64 = (0..mesh.num_cells()).map(|c| mesh.cell_polygon(c).intersection(&hole).unsigned_area()).sum();
    assert!(overlap < 1e-9, "overlap {overlap}");
    for area in &mesh.room_area {
        assert!((area - 0.42).abs() < 0.08, "room area {area}");
    }
}

#[test]
fn fixed_sites_do_not_move() {
    let (sites, labels) = grid(1.0, 1.0, 3, 3, 2);
    let pinned = sites[4];
    let mut p = problem(rect(1.0, 1.0), sites, labels, vec![1.0, 1.0]);
    p.site_fixed = (0..9).map(|i| i == 4).collect();
    let mesh = PowerDiagramSolver::default().solve(&p).unwrap();
    assert_eq!(mesh.site2xy[4], pinned);
}

#[test]
fn iteration_budget_is_respected() {
    let (sites, labels) = grid(1.0, 1.0, 3, 3, 3);
    let params = Params { max_iterations: 5, min_iterations: 5, ..Params::default() };
    let mesh = PowerDiagramSolver::new(params)
        .solve(&problem(rect(1.0, 1.0), sites, labels, vec![1.0, 2.0, 3.0]))
        .unwrap();
    assert!(mesh.iterations <= 5);
}

#[test]
fn room_without_site_is_rejected() {
    let sites = vec![Coord { x: 0.5, y: 0.5 }];
    let err = PowerDiagramSolver::default()
        .solve(&problem(rect(1.0, 1.0), sites, vec![0], vec![1.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, SolveError::InvalidSites(_)));
}

#[test]
fn degenerate_boundary_is_rejected() {
    let boundary = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }];
    let err = PowerDiagramSolver::default()
        .solve(&problem(boundary, vec![Coord { x: 0.5, y: 0.5 }], vec![0], vec![1.0]))
        .unwrap_err();
    assert!(matches!(err, SolveError::InvalidBoundary(_)));
    assert!(err.to_string().starts_with("invalid boundary"));
}
