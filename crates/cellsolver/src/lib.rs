//! Area-constrained partitioning of a polygon (holes allowed) into "rooms".
//!
//! Every room owns one or more sites.  The optimizer moves the sites and
//! adjusts one additive weight per room until the power diagram of the sites,
//! clipped to the boundary, gives every room (approximately) its requested
//! share of the area.  The result is a [`CellMesh`]: one polygon per
//! surviving site cell plus the wall edges separating cells of different
//! rooms.
//!
//! The crate uses no randomness; callers that want varied layouts vary the
//! site positions and the order in which rooms first appear among the sites.

mod clip;
mod mesh;
mod optimize;
mod power;

use std::fmt;

use geo::Coord;

pub use mesh::CellMesh;
pub use optimize::{Params, PowerDiagramSolver};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors reported by [`PowerDiagramSolver::solve`].
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// The boundary ring is degenerate (too few vertices, zero area, NaN).
    InvalidBoundary(String),
    /// Site arrays are inconsistent with each other or with the room list.
    InvalidSites(String),
    /// The optimizer ended with a room that owns no area at all.
    Degenerate(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBoundary(msg) => write!(f, "invalid boundary: {msg}"),
            Self::InvalidSites(msg) => write!(f, "invalid sites: {msg}"),
            Self::Degenerate(msg) => write!(f, "degenerate partition: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// Input of one partition run.
///
/// `boundary` is a simple outer ring and `holes` are rings strictly inside it
/// (closing vertex optional, any orientation).  Holes are excluded from every
/// cell and from the area targets.  `site_room[i]` is the room of `sites[i]`;
/// rooms are numbered `0..room_area.len()`.  Pinned sites
/// (`site_fixed[i] == true`) never move.
#[derive(Clone, Debug, Default)]
pub struct Problem {
    pub boundary: Vec<Coord<f64>>,
    pub holes: Vec<Vec<Coord<f64>>>,
    pub sites: Vec<Coord<f64>>,
    pub site_room: Vec<usize>,
    pub site_fixed: Vec<bool>,
    /// Target area per room.  Only the proportions matter; they are rescaled
    /// to the boundary area.
    pub room_area: Vec<f64>,
    /// Pairs of rooms that should share a wall.
    pub room_links: Vec<(usize, usize)>,
}

impl Problem {
    /// Number of rooms.
    pub fn num_rooms(&self) -> usize {
        self.room_area.len()
    }

    /// Number of sites.
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub(crate) fn validate(&self) -> Result<(), SolveError> {
        let valid_ring = self.boundary.iter().filter(|c| c.x.is_finite() && c.y.is_finite()).count();
        if valid_ring != self.boundary.len() {
            return Err(SolveError::InvalidBoundary("non-finite coordinate".into()));
        }
        if self.boundary.len() < 3 {
            return Err(SolveError::InvalidBoundary(format!("{} vertices", self.boundary.len())));
        }
        if let Some(h) = self.holes.iter().position(|h| h.len() < 3 || h.iter().any(|c| !c.x.is_finite() || !c.y.is_finite())) {
            return Err(SolveError::InvalidBoundary(format!("hole {h} is degenerate")));
        }
        if self.room_area.is_empty() {
            return Err(SolveError::InvalidSites("no rooms".into()));
        }
        if self.room_area.iter().any(|a| !a.is_finite() || *a <= 0.0) {
            return Err(SolveError::InvalidSites("room areas must be positive".into()));
        }
        if self.site_room.len() != self.sites.len() {
            return Err(SolveError::InvalidSites(format!(
                "{} sites but {} room labels", self.sites.len(), self.site_room.len()
            )));
        }
        if !self.site_fixed.is_empty() && self.site_fixed.len() != self.sites.len() {
            return Err(SolveError::InvalidSites(format!(
                "{} sites but {} fixed flags", self.sites.len(), self.site_fixed.len()
            )));
        }
        if let Some(&r) = self.site_room.iter().find(|&&r| r >= self.num_rooms()) {
            return Err(SolveError::InvalidSites(format!("site room {r} out of range")));
        }
        if self.sites.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(SolveError::InvalidSites("non-finite site".into()));
        }
        let mut seen = vec![false; self.num_rooms()];
        for &r in &self.site_room {
            seen[r] = true;
        }
        if let Some(r) = seen.iter().position(|s| !s) {
            return Err(SolveError::InvalidSites(format!("room {r} has no site")));
        }
        if let Some(&(a, b)) = self.room_links.iter().find(|(a, b)| *a >= self.num_rooms() || *b >= self.num_rooms()) {
            return Err(SolveError::InvalidSites(format!("room link ({a}, {b}) out of range")));
        }
        Ok(())
    }

    pub(crate) fn is_fixed(&self, site: usize) -> bool {
        self.site_fixed.get(site).copied().unwrap_or(false)
    }
}
