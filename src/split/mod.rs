//! Single-level polygon splitting.

mod seats;
mod splitter;
mod walls;

pub use seats::allocate_seats;
pub use splitter::{PolygonSplitter, Split};
pub use walls::chain_walls;
