//! Contract around the space-partitioning routine.
//!
//! The splitter only talks to a [`PartitionSolver`]; the production
//! implementation forwards to the `cellsolver` power-diagram optimizer.

use cellsolver::{Params, PowerDiagramSolver, Problem};
use geo::{Coord, Line, LineString, Polygon};
use thiserror::Error;

/// One split problem in normalized coordinates.
#[derive(Clone, Debug)]
pub struct SolverInput {
    /// Boundary polygon, scaled to roughly the unit square.
    pub boundary: Polygon<f64>,
    pub sites: Vec<Coord<f64>>,
    /// Room index of each site.
    pub site_rooms: Vec<usize>,
    /// Sites the solver must not move.
    pub site_fixed: Vec<bool>,
    /// Target area fraction per room.
    pub room_areas: Vec<f64>,
    /// Rooms that should end up adjacent.
    pub room_links: Vec<(usize, usize)>,
}

impl SolverInput {
    #[inline] pub fn num_rooms(&self) -> usize { self.room_areas.len() }
}

/// Solver output: room-tagged cells plus the walls between different rooms.
#[derive(Clone, Debug, Default)]
pub struct CellComplex {
    pub cells: Vec<(usize, Polygon<f64>)>,
    pub walls: Vec<Line<f64>>,
}

/// The solver gave up or produced nothing usable.  Always worth a retry.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct SolverFailure(pub String);

/// A routine that partitions a boundary into rooms of given area fractions.
///
/// No guaranteed success: it may fail, merge or drop rooms, or miss the
/// target areas.  Callers validate the result.
pub trait PartitionSolver: Send + Sync {
    fn solve(&self, input: &SolverInput) -> Result<CellComplex, SolverFailure>;
}

/// [`PartitionSolver`] backed by the power-diagram optimizer.
#[derive(Clone, Debug, Default)]
pub struct PowerDiagramAdapter {
    solver: PowerDiagramSolver,
}

impl PowerDiagramAdapter {
    pub fn new(max_iterations: usize) -> Self {
        let params = Params { max_iterations, ..Params::default() };
        Self { solver: PowerDiagramSolver::new(params) }
    }
}

impl PartitionSolver for PowerDiagramAdapter {
    fn solve(&self, input: &SolverInput) -> Result<CellComplex, SolverFailure> {
        let problem = Problem {
            boundary: open_ring(input.boundary.exterior()),
            holes: input.boundary.interiors().iter().map(open_ring).collect(),
            sites: input.sites.clone(),
            site_room: input.site_rooms.clone(),
            site_fixed: input.site_fixed.clone(),
            room_area: input.room_areas.clone(),
            room_links: input.room_links.clone(),
        };

        let mesh = self.solver.solve(&problem).map_err(|e| SolverFailure(e.to_string()))?;
        tracing::trace!(iterations = mesh.iterations, cells = mesh.num_cells(), "power diagram solved");

        let cells = (0..mesh.num_cells())
            .map(|c| (problem.site_room[mesh.cell2site[c]], mesh.cell_polygon(c)))
            .collect();
        let walls = (0..mesh.wall2vtx.len())
            .map(|w| {
                let (a, b) = mesh.wall(w);
                Line::new(a, b)
            })
            .collect();
        Ok(CellComplex { cells, walls })
    }
}

fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords = ring.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}
