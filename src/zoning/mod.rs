mod catalog;
mod func_zone;
mod gen_plan;
mod terr_zone;

pub use catalog::ZoneCatalog;
pub use func_zone::FuncZone;
pub use gen_plan::GenPlan;
pub use terr_zone::TerritoryZone;

use crate::error::{PlannerError, Result};

/// A named zone with a minimum viable area.
pub trait Zone: Clone {
    fn name(&self) -> &str;

    /// Smallest area (m²) this zone can occupy.
    fn min_area(&self) -> f64;
}

/// Validate a ratio map and scale it to sum to 1.
///
/// Entries must be unique by name with finite positive ratios.
pub(crate) fn normalize<Z: Zone>(owner: &str, entries: Vec<(Z, f64)>) -> Result<Vec<(Z, f64)>> {
    if entries.is_empty() {
        return Err(PlannerError::ConstraintViolation(format!("{owner}: empty ratio map")));
    }
    for (i, (zone, ratio)) in entries.iter().enumerate() {
        if !ratio.is_finite() || *ratio <= 0.0 {
            return Err(PlannerError::ConstraintViolation(format!(
                "{owner}: ratio of \"{}\" must be positive, got {ratio}",
                zone.name()
            )));
        }
        if entries[..i].iter().any(|(other, _)| other.name() == zone.name()) {
            return Err(PlannerError::ConstraintViolation(format!(
                "{owner}: zone \"{}\" listed twice",
                zone.name()
            )));
        }
    }
    Ok(rescale(entries))
}

fn rescale<Z>(entries: Vec<(Z, f64)>) -> Vec<(Z, f64)> {
    let sum: f64 = entries.iter().map(|(_, r)| r).sum();
    entries.into_iter().map(|(z, r)| (z, r / sum)).collect()
}

/// `max(zone.min_area / ratio)`: the smallest area at which every entry can
/// still meet its own minimum.
pub(crate) fn derived_min_area<Z: Zone>(entries: &[(Z, f64)]) -> f64 {
    entries.iter().map(|(z, r)| z.min_area() / r).fold(0.0, f64::max)
}

/// Drop zones whose share of `area` would fall below `factor × min_area`,
/// renormalizing after every pass until the set is stable.
///
/// Terminates after at most `entries.len()` passes.  The result is empty
/// when no zone fits.
pub fn filter_feasible<Z: Zone>(area: f64, entries: &[(Z, f64)], factor: f64) -> Vec<(Z, f64)> {
    let mut current: Vec<(Z, f64)> = entries.to_vec();
    while !current.is_empty() {
        current = rescale(current);
        let before = current.len();
        current.retain(|(z, r)| z.min_area() * factor < area * r);
        if current.len() == before {
            break;
        }
        tracing::debug!(area, dropped = before - current.len(), kept = current.len(), "zones below minimum area");
    }
    current
}
