//! Zone assignment over a territory made of several disjoint features.

mod lp;
mod proxy;

pub use lp::{Allocation, AssignmentProblem, solve_assignment};
pub use proxy::{all_pairs, permitted_pairs};

use geo::{Area, Polygon};
use rand::Rng;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::geom::{Geometries, elastic_wrap};
use crate::split::PolygonSplitter;
use crate::zoning::{FuncZone, TerritoryZone, Zone, filter_feasible};

/// Territorial zones placed on one feature, with their areas.
#[derive(Clone, Debug)]
pub struct FeatureZoning {
    pub feature: usize,
    pub zones: Vec<(TerritoryZone, f64)>,
}

/// Distribute the territorial zones of `func_zone` over `features`.
///
/// The elastic wrap of the features is split into proxy regions, one per
/// zone, to suggest which feature should carry which zone.  The areas come
/// from [`solve_assignment`]; when the suggested pairs admit no solution the
/// program is solved again with every pair allowed.  Features left without
/// area get the dominant zone.
pub fn assign_features<R: Rng + ?Sized>(
    features: &[Polygon<f64>],
    func_zone: &FuncZone,
    splitter: &PolygonSplitter<'_>,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<Vec<FeatureZoning>> {
    let capacities: Vec<f64> = features.iter().map(|f| f.unsigned_area()).collect();
    let total: f64 = capacities.iter().sum();

    let zones = filter_feasible(total, func_zone.zones_ratio(), config.multi_feature_min_factor);
    if zones.is_empty() {
        return Err(PlannerError::InfeasibleZoning {
            area: total,
            required: smallest_minimum(func_zone.zones_ratio()) * config.multi_feature_min_factor,
            context: format!("{func_zone} over {} features", features.len()),
        });
    }
    tracing::debug!(func_zone = func_zone.name(), features = features.len(), zones = zones.len(), "assigning zones");

    let problem = |permitted| AssignmentProblem {
        capacities: capacities.clone(),
        min_areas: zones.iter().map(|(z, _)| z.min_block_area()).collect(),
        targets: zones.iter().map(|(_, r)| r * total * config.lp_target_share).collect(),
        permitted,
    };

    let suggested = proxy_pairs(features, &zones, splitter, rng);
    let allocations = match suggested {
        Some(pairs) => solve_assignment(&problem(pairs)).or_else(|err| {
            tracing::warn!(%err, "proxy-guided assignment failed, allowing every pair");
            solve_assignment(&problem(all_pairs(features.len(), zones.len())))
        })?,
        None => solve_assignment(&problem(all_pairs(features.len(), zones.len())))?,
    };

    let dominant = zones
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(z, _)| z.clone())
        .unwrap_or_else(|| func_zone.dominant().clone());

    Ok((0..features.len())
        .map(|feature| {
            let mut placed: Vec<(TerritoryZone, f64)> = allocations
                .iter()
                .filter(|a| a.feature == feature)
                .map(|a| (zones[a.zone].0.clone(), a.area))
                .collect();
            if placed.is_empty() {
                placed.push((dominant.clone(), capacities[feature]));
            }
            FeatureZoning { feature, zones: placed }
        })
        .collect())
}

/// Pairs suggested by splitting the elastic wrap; `None` when no proxy
/// partition could be built.
fn proxy_pairs<R: Rng + ?Sized>(
    features: &[Polygon<f64>],
    zones: &[(TerritoryZone, f64)],
    splitter: &PolygonSplitter<'_>,
    rng: &mut R,
) -> Option<Vec<(usize, usize)>> {
    let wrap = elastic_wrap(features)?;
    let ratios: Vec<(String, f64)> = zones.iter().map(|(z, r)| (z.name().to_string(), *r)).collect();
    match splitter.split(&wrap, &ratios, &[], rng) {
        Ok(split) => {
            let proxies = Geometries::new(split.zones.into_iter().map(|(_, p)| p).collect());
            Some(permitted_pairs(features, &proxies))
        }
        Err(err) => {
            tracing::warn!(%err, "proxy partition failed");
            None
        }
    }
}

fn smallest_minimum<Z: Zone>(entries: &[(Z, f64)]) -> f64 {
    entries.iter().map(|(z, _)| z.min_area()).fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::solver::PowerDiagramAdapter;

    fn square(x: f64, y: f64, side: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + side, y: y), (x: x + side, y: y + side), (x: x, y: y + side)]
    }

    #[test]
    fn every_feature_gets_zones_and_targets_are_met() {
        let zone_a = TerritoryZone::new("residential", 10_000.0);
        let zone_b = TerritoryZone::new("business", 10_000.0);
        let func_zone = FuncZone::new("mixed", [(zone_a, 0.6), (zone_b, 0.4)]).unwrap();
        let features = vec![square(0.0, 0.0, 300.0), square(400.0, 0.0, 200.0), square(0.0, 400.0, 250.0)];

        let solver = PowerDiagramAdapter::new(250);
        let config = PlannerConfig::default();
        let splitter = PolygonSplitter::new(&solver, &config);
        let zoning = assign_features(&features, &func_zone, &splitter, &config, &mut StdRng::seed_from_u64(11)).unwrap();

        assert_eq!(zoning.len(), 3);
        let total: f64 = features.iter().map(|f| f.unsigned_area()).sum();
        for name in ["residential", "business"] {
            let placed: f64 = zoning.iter().flat_map(|z| &z.zones).filter(|(z, _)| z.name() == name).map(|(_, a)| a).sum();
            let share = func_zone.ratio_of(name).unwrap();
            assert!(placed >= share * total * 0.999 - 1.0, "{name}: {placed}");
        }
        for z in &zoning {
            let used: f64 = z.zones.iter().map(|(_, a)| a).sum();
            assert!(used <= features[z.feature].unsigned_area() + 1.0);
        }
    }

    #[test]
    fn tiny_territory_is_infeasible() {
        let zone = TerritoryZone::new("industrial", 320_000.0);
        let func_zone = FuncZone::new("industry", [(zone, 1.0)]).unwrap();
        let features = vec![square(0.0, 0.0, 100.0), square(200.0, 0.0, 100.0)];

        let solver = PowerDiagramAdapter::new(10);
        let config = PlannerConfig::default();
        let splitter = PolygonSplitter::new(&solver, &config);
        let err = assign_features(&features, &func_zone, &splitter, &config, &mut StdRng::seed_from_u64(3)).unwrap_err();
        assert!(matches!(err, PlannerError::InfeasibleZoning { .. }));
    }
}
