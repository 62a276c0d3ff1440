mod buffer;
mod geom;
mod lines;
mod poisson;
mod proj;
mod simplify;
mod transform;
mod wrap;

pub use buffer::{buffer_lines, capsule, dilate, erode, union_all};
pub use geom::Geometries;
pub use lines::{
    explode, multilinestring_of, point_polygon_distance, point_segment_distance,
    polygon_distance, segments,
};
pub use poisson::poisson_seed;
pub use proj::{Crs, LocalProjection};
pub use simplify::{simplify_multipolygon, simplify_polygon};
pub use transform::{Alignment, Normalizer};
pub use wrap::elastic_wrap;
