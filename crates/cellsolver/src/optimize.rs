use std::f64::consts::TAU;

use ahash::AHashSet;
use geo::{Area, BooleanOps, Coord, LineString, MultiLineString, Polygon, Rect};

use crate::clip::{area_centroid, clip_to_convex, contains, open_ccw};
use crate::mesh::{CellMesh, MeshBuilder, VertexPool};
use crate::power::power_cell;
use crate::{Problem, SolveError};

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Tuning knobs of the optimizer.
#[derive(Clone, Debug)]
pub struct Params {
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Iterations always performed before the stopping test is applied.
    pub min_iterations: usize,
    /// Stop once every room is within this relative error of its target.
    pub tolerance: f64,
    /// Step size of the per-room weight update.
    pub weight_rate: f64,
    /// Fraction of the way each site moves towards its cell centroid.
    pub lloyd: f64,
    /// Fraction of the way each site moves towards its room centroid.
    pub cohesion: f64,
    /// Attraction between linked rooms that do not yet share a wall.
    pub link_pull: f64,
    /// Period, in iterations, of the disconnected-room repair.
    pub repair_every: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_iterations: 250,
            min_iterations: 20,
            tolerance: 0.01,
            weight_rate: 0.5,
            lloyd: 0.5,
            cohesion: 0.1,
            link_pull: 0.05,
            repair_every: 8,
        }
    }
}

/// Capacity-constrained power diagram optimizer.
#[derive(Clone, Debug, Default)]
pub struct PowerDiagramSolver {
    params: Params,
}

/// Per-iteration measurements of the current diagram.
struct Evaluation {
    site_area: Vec<f64>,
    site_centroid: Vec<Coord<f64>>,
    room_area: Vec<f64>,
    room_centroid: Vec<Coord<f64>>,
    /// Pairs `(i, j)`, `i < j`, of sites whose cells touch and both own area.
    neighbours: Vec<(usize, usize)>,
}

/// Fixed geometry shared by every iteration.
struct Domain {
    ring: Vec<Coord<f64>>,
    holes: Vec<Vec<Coord<f64>>>,
    frame: Rect<f64>,
    total: f64,
    extent: f64,
    targets: Vec<f64>,
}

impl PowerDiagramSolver {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Run the optimizer and return the mesh of the best diagram it found.
    pub fn solve(&self, problem: &Problem) -> Result<CellMesh, SolveError> {
        problem.validate()?;
        let domain = Domain::new(problem)?;

        let mut sites = reseat(problem, &domain.ring);
        let mut weights = vec![0.0; problem.num_rooms()];
        let room_sites = sites_per_room(problem);

        let mut best: Option<(f64, Vec<Coord<f64>>, Vec<f64>)> = None;
        let mut iterations = 0;

        for it in 0..self.params.max_iterations.max(1) {
            iterations = it + 1;
            let site_weights: Vec<f64> = problem.site_room.iter().map(|&r| weights[r]).collect();
            let eval = evaluate(problem, &domain, &sites, &site_weights);

            let error = domain
                .targets
                .iter()
                .zip(&eval.room_area)
                .map(|(t, a)| (t - a).abs() / t)
                .fold(0.0, f64::max);
            let split_rooms = disconnected_rooms(problem, &eval);
            let score = error + split_rooms.len() as f64;
            if best.as_ref().is_none_or(|(s, _, _)| score < *s) {
                best = Some((score, sites.clone(), weights.clone()));
            }
            if it + 1 >= self.params.min_iterations && error < self.params.tolerance && split_rooms.is_empty() {
                break;
            }

            self.update_weights(&domain, &eval, &room_sites, &mut weights);
            self.move_sites(problem, &domain, &eval, &mut sites);
            self.pull_links(problem, &domain, &eval, &mut sites);
            if self.params.repair_every > 0 && (it + 1) % self.params.repair_every == 0 {
                repair(problem, &domain, &eval, &split_rooms, &mut sites);
            }
        }

        let Some((_, sites, weights)) = best else {
            return Err(SolveError::Degenerate("no iteration performed".into()));
        };
        let site_weights: Vec<f64> = problem.site_room.iter().map(|&r| weights[r]).collect();
        let eval = evaluate(problem, &domain, &sites, &site_weights);
        if let Some(r) = eval.room_area.iter().position(|&a| a <= domain.total * 1e-9) {
            return Err(SolveError::Degenerate(format!("room {r} owns no area")));
        }

        let mut mesh = build_mesh(problem, &domain, &sites, &site_weights);
        mesh.site2xy = sites;
        mesh.room_area = eval.room_area;
        mesh.iterations = iterations;
        Ok(mesh)
    }

    fn update_weights(&self, domain: &Domain, eval: &Evaluation, room_sites: &[usize], weights: &mut [f64]) {
        let sites: usize = room_sites.iter().sum();
        let limit = 0.5 * domain.total / sites.max(1) as f64;
        for (r, w) in weights.iter_mut().enumerate() {
            let deficit = domain.targets[r] - eval.room_area[r];
            let step = self.params.weight_rate * deficit / (2.0 * (room_sites[r].max(1) as f64).sqrt());
            *w += step.clamp(-limit, limit);
        }
        let mean = weights.iter().sum::<f64>() / weights.len() as f64;
        weights.iter_mut().for_each(|w| *w -= mean);
    }

    fn move_sites(&self, problem: &Problem, domain: &Domain, eval: &Evaluation, sites: &mut [Coord<f64>]) {
        let eps = domain.total * 1e-12;
        for i in 0..sites.len() {
            if problem.is_fixed(i) {
                continue;
            }
            let p = sites[i];
            let room = eval.room_centroid[problem.site_room[i]];
            let target = if eval.site_area[i] > eps { eval.site_centroid[i] } else { room };
            let next = Coord {
                x: p.x + self.params.lloyd * (target.x - p.x) + self.params.cohesion * (room.x - p.x),
                y: p.y + self.params.lloyd * (target.y - p.y) + self.params.cohesion * (room.y - p.y),
            };
            if domain.inside(next) {
                sites[i] = next;
            } else if domain.inside(target) {
                sites[i] = target;
            }
        }
    }

    fn pull_links(&self, problem: &Problem, domain: &Domain, eval: &Evaluation, sites: &mut [Coord<f64>]) {
        if problem.room_links.is_empty() || self.params.link_pull <= 0.0 {
            return;
        }
        let touching: AHashSet<(usize, usize)> = eval
            .neighbours
            .iter()
            .map(|&(i, j)| {
                let (a, b) = (problem.site_room[i], problem.site_room[j]);
                (a.min(b), a.max(b))
            })
            .collect();
        for &(a, b) in &problem.room_links {
            if a == b || touching.contains(&(a.min(b), a.max(b))) {
                continue;
            }
            for i in 0..sites.len() {
                let toward = match problem.site_room[i] {
                    r if r == a => eval.room_centroid[b],
                    r if r == b => eval.room_centroid[a],
                    _ => continue,
                };
                if problem.is_fixed(i) {
                    continue;
                }
                let p = sites[i];
                let next = Coord {
                    x: p.x + self.params.link_pull * (toward.x - p.x),
                    y: p.y + self.params.link_pull * (toward.y - p.y),
                };
                if domain.inside(next) {
                    sites[i] = next;
                }
            }
        }
    }
}

impl Domain {
    fn new(problem: &Problem) -> Result<Self, SolveError> {
        let ring = open_ccw(&problem.boundary);
        let holes: Vec<Vec<Coord<f64>>> = problem.holes.iter().map(|h| open_ccw(h)).filter(|h| h.len() >= 3).collect();
        let (outer, _) = area_centroid(&ring);
        let total = outer - holes.iter().map(|h| area_centroid(h).0).sum::<f64>();
        if ring.len() < 3 || total <= 0.0 {
            return Err(SolveError::InvalidBoundary("zero area".into()));
        }

        let (mut min, mut max) = (ring[0], ring[0]);
        for c in &ring {
            min = Coord { x: min.x.min(c.x), y: min.y.min(c.y) };
            max = Coord { x: max.x.max(c.x), y: max.y.max(c.y) };
        }
        let extent = (max.x - min.x).max(max.y - min.y);
        let frame = Rect::new(
            Coord { x: min.x - extent, y: min.y - extent },
            Coord { x: max.x + extent, y: max.y + extent },
        );

        let sum: f64 = problem.room_area.iter().sum();
        let targets = problem.room_area.iter().map(|a| a * total / sum).collect();
        Ok(Self { ring, holes, frame, total, extent, targets })
    }

    fn inside(&self, p: Coord<f64>) -> bool {
        contains(&self.ring, p) && !self.holes.iter().any(|h| contains(h, p))
    }

    /// Area and centroid of the part of a convex cell inside the domain.
    fn clip(&self, cell: &[Coord<f64>]) -> (f64, Coord<f64>) {
        let (outer, centroid) = area_centroid(&clip_to_convex(&self.ring, cell));
        if self.holes.is_empty() || outer <= 0.0 {
            return (outer, centroid);
        }
        let (mut area, mut mx, mut my) = (outer, outer * centroid.x, outer * centroid.y);
        for hole in &self.holes {
            let (a, c) = area_centroid(&clip_to_convex(hole, cell));
            area -= a;
            mx -= a * c.x;
            my -= a * c.y;
        }
        if area <= self.total * 1e-12 {
            return (0.0, centroid);
        }
        (area, Coord { x: mx / area, y: my / area })
    }
}

fn sites_per_room(problem: &Problem) -> Vec<usize> {
    let mut counts = vec![0; problem.num_rooms()];
    for &r in &problem.site_room {
        counts[r] += 1;
    }
    counts
}

fn evaluate(problem: &Problem, domain: &Domain, sites: &[Coord<f64>], weights: &[f64]) -> Evaluation {
    let n = sites.len();
    let rooms = problem.num_rooms();
    let mut site_area = vec![0.0; n];
    let mut site_centroid = sites.to_vec();
    let mut cells = Vec::with_capacity(n);

    for i in 0..n {
        let cell = power_cell(i, sites, weights, &domain.frame);
        if !cell.is_empty() {
            let (area, centroid) = domain.clip(&cell.vertices);
            site_area[i] = area;
            if area > 0.0 {
                site_centroid[i] = centroid;
            }
        }
        cells.push(cell);
    }

    let eps = domain.total * 1e-12;
    let mut neighbours = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        for j in cell.tags.iter().flatten().copied() {
            if i < j && site_area[i] > eps && site_area[j] > eps {
                neighbours.push((i, j));
            }
        }
    }
    neighbours.sort_unstable();
    neighbours.dedup();

    let mut room_area = vec![0.0; rooms];
    let mut moment = vec![Coord { x: 0.0, y: 0.0 }; rooms];
    let mut fallback = vec![(Coord { x: 0.0, y: 0.0 }, 0usize); rooms];
    for i in 0..n {
        let r = problem.site_room[i];
        room_area[r] += site_area[i];
        moment[r].x += site_centroid[i].x * site_area[i];
        moment[r].y += site_centroid[i].y * site_area[i];
        fallback[r].0.x += sites[i].x;
        fallback[r].0.y += sites[i].y;
        fallback[r].1 += 1;
    }
    let room_centroid = (0..rooms)
        .map(|r| {
            if room_area[r] > eps {
                Coord { x: moment[r].x / room_area[r], y: moment[r].y / room_area[r] }
            } else {
                let k = fallback[r].1.max(1) as f64;
                Coord { x: fallback[r].0.x / k, y: fallback[r].0.y / k }
            }
        })
        .collect();

    Evaluation { site_area, site_centroid, room_area, room_centroid, neighbours }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Connected components of positive-area sites, per room.  Each component is
/// a list of site indices.
fn components(problem: &Problem, eval: &Evaluation) -> Vec<Vec<Vec<usize>>> {
    let n = problem.num_sites();
    let mut parent: Vec<usize> = (0..n).collect();
    for &(i, j) in &eval.neighbours {
        if problem.site_room[i] == problem.site_room[j] {
            let (a, b) = (find(&mut parent, i), find(&mut parent, j));
            if a != b {
                parent[a] = b;
            }
        }
    }

    let mut groups: Vec<Vec<Vec<usize>>> = vec![Vec::new(); problem.num_rooms()];
    let mut slot = vec![usize::MAX; n];
    for i in 0..n {
        if eval.site_area[i] <= 0.0 {
            continue;
        }
        let root = find(&mut parent, i);
        let room = &mut groups[problem.site_room[i]];
        if slot[root] == usize::MAX {
            slot[root] = room.len();
            room.push(Vec::new());
        }
        room[slot[root]].push(i);
    }
    groups
}

/// Rooms that are split into several pieces or own nothing at all.
fn disconnected_rooms(problem: &Problem, eval: &Evaluation) -> Vec<usize> {
    components(problem, eval)
        .iter()
        .enumerate()
        .filter(|(_, comps)| comps.len() != 1)
        .map(|(r, _)| r)
        .collect()
}

/// Move the free sites of every minor component next to the main component
/// of their room.  The main component is the one holding a pinned site, or
/// else the largest one.
fn repair(problem: &Problem, domain: &Domain, eval: &Evaluation, rooms: &[usize], sites: &mut [Coord<f64>]) {
    let groups = components(problem, eval);
    for &r in rooms {
        let comps = &groups[r];
        if comps.len() < 2 {
            continue;
        }
        let area = |c: &Vec<usize>| c.iter().map(|&i| eval.site_area[i]).sum::<f64>();
        let main = comps
            .iter()
            .position(|c| c.iter().any(|&i| problem.is_fixed(i)))
            .unwrap_or_else(|| {
                (0..comps.len()).max_by(|&a, &b| area(&comps[a]).total_cmp(&area(&comps[b]))).unwrap_or(0)
            });

        let main_area = area(&comps[main]);
        let anchor = if main_area > 0.0 {
            let (sx, sy) = comps[main].iter().fold((0.0, 0.0), |(sx, sy), &i| {
                (sx + eval.site_centroid[i].x * eval.site_area[i], sy + eval.site_centroid[i].y * eval.site_area[i])
            });
            Coord { x: sx / main_area, y: sy / main_area }
        } else {
            eval.room_centroid[r]
        };
        let radius = 0.1 * domain.targets[r].sqrt();

        let mut k = 0;
        for (c, comp) in comps.iter().enumerate() {
            if c == main {
                continue;
            }
            for &i in comp {
                if problem.is_fixed(i) {
                    continue;
                }
                k += 1;
                let theta = k as f64 * GOLDEN_ANGLE;
                let candidate = Coord { x: anchor.x + radius * theta.cos(), y: anchor.y + radius * theta.sin() };
                if domain.inside(candidate) {
                    sites[i] = candidate;
                } else if domain.inside(anchor) {
                    sites[i] = anchor;
                }
            }
        }
    }
}

/// Rearrange the free sites so that every room starts as a contiguous
/// angular sector around the boundary centroid.  Rooms with pinned sites
/// first claim the free positions nearest to their pins.  The remaining rooms
/// follow each other around the centroid in the order in which they first
/// appear among the free sites, starting at the first free site, so the
/// caller's labelling decides which rooms end up side by side.
fn reseat(problem: &Problem, ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut sites = problem.sites.clone();
    let free: Vec<usize> = (0..sites.len()).filter(|&i| !problem.is_fixed(i)).collect();
    if free.len() < 2 {
        return sites;
    }

    let mut slots: Vec<Coord<f64>> = free.iter().map(|&i| sites[i]).collect();
    let mut by_room: Vec<Vec<usize>> = vec![Vec::new(); problem.num_rooms()];
    for &i in &free {
        by_room[problem.site_room[i]].push(i);
    }

    let mut order: Vec<usize> = Vec::with_capacity(problem.num_rooms());
    for &i in &free {
        let r = problem.site_room[i];
        if !order.contains(&r) {
            order.push(r);
        }
    }

    let mut pending: Vec<usize> = Vec::with_capacity(free.len());
    for &r in &order {
        let members = &by_room[r];
        let pins: Vec<Coord<f64>> =
            (0..sites.len()).filter(|&i| problem.is_fixed(i) && problem.site_room[i] == r).map(|i| sites[i]).collect();
        if pins.is_empty() {
            pending.extend(members);
            continue;
        }
        let k = pins.len() as f64;
        let pin = pins.iter().fold(Coord { x: 0.0, y: 0.0 }, |acc, p| Coord { x: acc.x + p.x / k, y: acc.y + p.y / k });
        let d2 = |c: &Coord<f64>| (c.x - pin.x).powi(2) + (c.y - pin.y).powi(2);
        slots.sort_by(|a, b| d2(b).total_cmp(&d2(a)));
        for &i in members {
            if let Some(slot) = slots.pop() {
                sites[i] = slot;
            }
        }
    }

    let (_, center) = area_centroid(ring);
    let angle = |p: &Coord<f64>| (p.y - center.y).atan2(p.x - center.x);
    let start = angle(&problem.sites[free[0]]);
    slots.sort_by(|a, b| (angle(a) - start).rem_euclid(TAU).total_cmp(&(angle(b) - start).rem_euclid(TAU)));
    for (slot, i) in slots.into_iter().zip(pending) {
        sites[i] = slot;
    }
    sites
}

fn build_mesh(problem: &Problem, domain: &Domain, sites: &[Coord<f64>], weights: &[f64]) -> CellMesh {
    let holes = domain.holes.iter().map(|h| LineString::from(h.clone())).collect();
    let boundary = Polygon::new(LineString::from(domain.ring.clone()), holes);
    let mut pool = VertexPool::new(domain.extent * 1e-7);
    let mut builder = MeshBuilder::new();
    let min_area = domain.total * 1e-9;

    for i in 0..sites.len() {
        let cell = power_cell(i, sites, weights, &domain.frame);
        if cell.is_empty() {
            continue;
        }

        let convex = Polygon::new(LineString::from(cell.vertices.clone()), vec![]);
        for part in convex.intersection(&boundary) {
            if part.unsigned_area() <= min_area {
                continue;
            }
            if let Some(c) = builder.push_cell(&mut pool, i, &open_ccw(&part.exterior().0)) {
                for hole in part.interiors() {
                    builder.push_hole(&mut pool, c, &hole.0);
                }
            }
        }

        let len = cell.vertices.len();
        for (k, tag) in cell.tags.iter().enumerate() {
            let Some(j) = *tag else { continue };
            if j < i || problem.site_room[i] == problem.site_room[j] {
                continue;
            }
            let edge = LineString::from(vec![cell.vertices[k], cell.vertices[(k + 1) % len]]);
            for piece in boundary.clip(&MultiLineString::new(vec![edge]), false) {
                for line in piece.lines() {
                    builder.push_wall(&mut pool, line.start, line.end);
                }
            }
        }
    }
    builder.finish(pool)
}
