#![doc = "genplanner: synthetic urban block layouts from zoning ratios"]
pub mod assign;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod geom;
pub mod io;
pub mod planner;
pub mod roads;
pub mod solver;
pub mod split;
pub mod table;
pub mod zoning;

#[doc(inline)]
pub use config::PlannerConfig;

#[doc(inline)]
pub use error::{PlannerError, Result};

#[doc(inline)]
pub use planner::{GenPlanner, Operation, PlannerOptions, RatioParts};

#[doc(inline)]
pub use table::{Generation, Labels, RoadRecord, ZoneRecord};

#[doc(inline)]
pub use zoning::{FuncZone, GenPlan, TerritoryZone, ZoneCatalog};
