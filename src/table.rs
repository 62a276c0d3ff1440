//! Output rows of a generation and their tabular export.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use geo::{Area, Euclidean, Length, LineString, Polygon};
use polars::{df, frame::DataFrame, io::SerWriter, prelude::CsvWriter};

/// Road level of caller-supplied roads.
pub const EXISTING_ROAD: &str = "existing road";

/// Hierarchy labels collected while a branch descends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels {
    pub gen_plan: Option<String>,
    pub func_zone: Option<String>,
    pub territory_zone: Option<String>,
    /// Part name of a plain ratio split.
    pub zone: Option<String>,
}

impl Labels {
    pub fn with_gen_plan(mut self, name: &str) -> Self {
        self.gen_plan = Some(name.to_string());
        self
    }

    pub fn with_func_zone(mut self, name: &str) -> Self {
        self.func_zone = Some(name.to_string());
        self
    }

    pub fn with_territory_zone(mut self, name: &str) -> Self {
        self.territory_zone = Some(name.to_string());
        self
    }

    pub fn with_zone(mut self, name: &str) -> Self {
        self.zone = Some(name.to_string());
        self
    }
}

/// A finished zone or block.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneRecord {
    pub geometry: Polygon<f64>,
    pub labels: Labels,
}

/// A road centreline with its level and width.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadRecord {
    pub geometry: LineString<f64>,
    pub level: String,
    /// Metres.
    pub width: f64,
}

impl RoadRecord {
    pub fn new(geometry: LineString<f64>, level: impl Into<String>, width: f64) -> Self {
        Self { geometry, level: level.into(), width }
    }
}

/// The two output tables of one run.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub zones: Vec<ZoneRecord>,
    pub roads: Vec<RoadRecord>,
}

impl Generation {
    /// Zone attributes, one row per zone.  `area_m2` is only meaningful while
    /// the geometry is still in a metric frame.
    pub fn zones_frame(&self) -> Result<DataFrame> {
        let label = |pick: fn(&Labels) -> &Option<String>| -> Vec<Option<String>> {
            self.zones.iter().map(|z| pick(&z.labels).clone()).collect()
        };
        Ok(df![
            "id" => (0..self.zones.len() as u32).collect::<Vec<_>>(),
            "gen_plan" => label(|l| &l.gen_plan),
            "func_zone" => label(|l| &l.func_zone),
            "territory_zone" => label(|l| &l.territory_zone),
            "zone" => label(|l| &l.zone),
            "area_m2" => self.zones.iter().map(|z| z.geometry.unsigned_area()).collect::<Vec<_>>(),
        ]?)
    }

    /// Road attributes, one row per road.
    pub fn roads_frame(&self) -> Result<DataFrame> {
        Ok(df![
            "id" => (0..self.roads.len() as u32).collect::<Vec<_>>(),
            "road_lvl" => self.roads.iter().map(|r| r.level.clone()).collect::<Vec<_>>(),
            "roads_width" => self.roads.iter().map(|r| r.width).collect::<Vec<_>>(),
            "length_m" => self.roads.iter().map(|r| Euclidean.length(&r.geometry)).collect::<Vec<_>>(),
        ]?)
    }
}

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[table::write_csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[table::write_csv] Failed to write CSV to {:?}", path))
}

#[cfg(test)]
mod tests {
    use geo::{line_string, polygon};

    use super::*;

    fn sample() -> Generation {
        let square = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        Generation {
            zones: vec![
                ZoneRecord {
                    geometry: square.clone(),
                    labels: Labels::default().with_func_zone("basic").with_territory_zone("residential"),
                },
                ZoneRecord { geometry: square, labels: Labels::default().with_zone("north") },
            ],
            roads: vec![RoadRecord::new(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)], "local road, level 1", 13.0)],
        }
    }

    #[test]
    fn zones_frame_has_one_row_per_zone() {
        let df = sample().zones_frame().unwrap();
        assert_eq!(df.height(), 2);
        let territory = df.column("territory_zone").unwrap().str().unwrap();
        assert_eq!(territory.get(0), Some("residential"));
        assert_eq!(territory.get(1), None);
        let area = df.column("area_m2").unwrap().f64().unwrap();
        assert_eq!(area.get(0), Some(100.0));
    }

    #[test]
    fn roads_frame_measures_length() {
        let df = sample().roads_frame().unwrap();
        let length = df.column("length_m").unwrap().f64().unwrap();
        assert_eq!(length.get(0), Some(5.0));
    }

    #[test]
    fn csv_export_writes_header() {
        let dir = std::env::temp_dir().join(format!("genplanner-table-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("zones.csv");
        write_csv(&mut sample().zones_frame().unwrap(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,gen_plan,func_zone,territory_zone,zone,area_m2"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
