//! Reading and writing of feature tables and outputs.

mod fs;
mod geojson;

pub use fs::ensure_dir_exists;
pub use geojson::{
    Feature, feature_collection, outline_features, polygons_of, read_geojson_bytes, read_geojson_file, road_features,
    write_geojson_file, zone_features,
};
