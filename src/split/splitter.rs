use std::cell::Cell;

use geo::{Area, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use rand::{Rng, seq::SliceRandom};

use super::{allocate_seats, chain_walls};
use crate::config::PlannerConfig;
use crate::error::{Attempt, PlannerError, Result, retry_bounded};
use crate::geom::{Alignment, Normalizer, poisson_seed, union_all};
use crate::solver::{PartitionSolver, SolverInput};

/// Parts smaller than this share of the boundary are numerical noise.
const SLIVER_SHARE: f64 = 1e-6;

/// Radius shrink applied when the seeding produced fewer points than rooms.
const RADIUS_SHRINK: f64 = 0.7;

/// Result of one polygon split.
#[derive(Clone, Debug, Default)]
pub struct Split {
    /// One polygon per input ratio, in input order.
    pub zones: Vec<(String, Polygon<f64>)>,
    /// Wall polylines between zones.
    pub roads: Vec<LineString<f64>>,
}

/// Splits a polygon into zones of given area ratios.
///
/// Every attempt re-seeds the polygon and reshuffles which seed belongs to
/// which zone, so a failed attempt says nothing about the next one.
pub struct PolygonSplitter<'a> {
    solver: &'a dyn PartitionSolver,
    config: &'a PlannerConfig,
}

/// The polygon moved into the solver's frame: aligned with its longest side
/// and scaled to unit size.
struct Frame {
    alignment: Alignment,
    normalizer: Normalizer,
    unit: Polygon<f64>,
    unit_area: f64,
}

impl Frame {
    fn of(polygon: &Polygon<f64>) -> Result<Self> {
        let alignment = Alignment::of(polygon);
        let aligned = alignment.align(polygon);
        let normalizer = Normalizer::of(&aligned)
            .ok_or_else(|| PlannerError::InvalidGeometry("polygon has no extent".into()))?;
        let unit = normalizer.to_unit(&aligned);
        let unit_area = unit.unsigned_area();
        Ok(Self { alignment, normalizer, unit, unit_area })
    }

    fn to_unit(&self, c: Coord<f64>) -> Coord<f64> {
        let aligned: Point<f64> = self.alignment.align(&Point::from(c));
        self.normalizer.normalize(aligned.0)
    }

    fn to_world<G>(&self, geometry: &G) -> G
    where
        G: geo::MapCoords<f64, f64, Output = G> + geo::Rotate<f64>,
    {
        self.alignment.restore(&self.normalizer.from_unit(geometry))
    }
}

impl<'a> PolygonSplitter<'a> {
    pub fn new(solver: &'a dyn PartitionSolver, config: &'a PlannerConfig) -> Self {
        Self { solver, config }
    }

    /// Split `polygon` into `ratios.len()` zones.
    ///
    /// `fixed` pins zones to locations: each point whose name is one of the
    /// ratio keys and which lies inside `polygon` becomes an immovable seed of
    /// that zone.  Other points are ignored.
    pub fn split<R: Rng + ?Sized>(
        &self,
        polygon: &Polygon<f64>,
        ratios: &[(String, f64)],
        fixed: &[(String, Coord<f64>)],
        rng: &mut R,
    ) -> Result<Split> {
        check_ratios(ratios)?;
        if ratios.len() == 1 {
            return Ok(Split { zones: vec![(ratios[0].0.clone(), polygon.clone())], roads: vec![] });
        }

        let frame = Frame::of(polygon)?;
        if frame.unit_area <= 0.0 {
            return Err(PlannerError::InvalidGeometry("polygon has no area".into()));
        }

        let total: f64 = ratios.iter().map(|(_, r)| r).sum();
        let shares: Vec<f64> = ratios.iter().map(|(_, r)| r / total).collect();
        let pinned: Vec<(usize, Coord<f64>)> = fixed
            .iter()
            .filter(|(_, c)| polygon.contains(c))
            .filter_map(|(name, c)| ratios.iter().position(|(n, _)| n == name).map(|i| (i, frame.to_unit(*c))))
            .collect();

        let radius = self.config.poisson_radius(ratios.len());
        let last_seeds = Cell::new(0usize);

        retry_bounded(
            self.config.split_attempts,
            |attempt| {
                let sites = seed_sites(&frame.unit, radius, ratios.len(), &mut *rng);
                last_seeds.set(sites.len());
                tracing::trace!(attempt, seeds = sites.len(), zones = ratios.len(), "split attempt");
                self.attempt(&frame, &shares, &pinned, sites, &mut *rng)
            },
            |attempts, reason| PlannerError::SolverDivergence {
                attempts,
                reason,
                ratios: ratios.to_vec(),
                seeds: last_seeds.get(),
                radius,
                polygon: polygon_wkt(polygon),
            },
        )
        .map(|(rooms, roads)| Split {
            zones: ratios.iter().map(|(n, _)| n.clone()).zip(rooms).collect(),
            roads,
        })
    }

    fn attempt<R: Rng + ?Sized>(
        &self,
        frame: &Frame,
        shares: &[f64],
        pinned: &[(usize, Coord<f64>)],
        sites: Vec<Coord<f64>>,
        rng: &mut R,
    ) -> Attempt<(Vec<Polygon<f64>>, Vec<LineString<f64>>)> {
        let rooms = shares.len();
        if sites.len() < rooms {
            return Attempt::Retryable(format!("{} seeds for {rooms} zones", sites.len()));
        }

        let seats = allocate_seats(shares, sites.len());
        let mut site_rooms: Vec<usize> = seats.iter().enumerate().flat_map(|(room, &n)| std::iter::repeat_n(room, n)).collect();
        site_rooms.shuffle(rng);

        let mut sites = sites;
        let mut site_fixed = vec![false; sites.len()];
        for &(room, c) in pinned {
            sites.push(c);
            site_rooms.push(room);
            site_fixed.push(true);
        }

        let input = SolverInput {
            boundary: frame.unit.clone(),
            sites,
            site_rooms,
            site_fixed,
            room_areas: shares.to_vec(),
            room_links: vec![],
        };
        let complex = match self.solver.solve(&input) {
            Ok(complex) => complex,
            Err(failure) => return Attempt::Retryable(format!("solver failed: {failure}")),
        };

        let mut parts: Vec<Vec<MultiPolygon<f64>>> = vec![Vec::new(); rooms];
        for (room, cell) in complex.cells {
            if let Some(bucket) = parts.get_mut(room) {
                bucket.push(MultiPolygon::new(vec![cell]));
            }
        }

        let sliver = frame.unit_area * SLIVER_SHARE;
        let mut dissolved = Vec::with_capacity(rooms);
        for (room, bucket) in parts.into_iter().enumerate() {
            let mut pieces: Vec<Polygon<f64>> =
                union_all(bucket).into_iter().filter(|p| p.unsigned_area() > sliver).collect();
            match pieces.len() {
                0 => {
                    let produced = dissolved.len();
                    return Attempt::Retryable(format!("zone {room} missing ({produced} of {rooms} produced)"));
                }
                1 => dissolved.extend(pieces.pop()),
                n => return Attempt::Retryable(format!("zone {room} split into {n} parts")),
            }
        }

        let areas: Vec<f64> = dissolved.iter().map(|p| p.unsigned_area()).collect();
        let covered: f64 = areas.iter().sum();
        let deviation = (covered - frame.unit_area).abs() / frame.unit_area;
        if deviation > self.config.area_tolerance {
            return Attempt::Retryable(format!("total area off by {:.1}%", deviation * 100.0));
        }
        if let Some(tolerance) = self.config.room_area_tolerance {
            for (room, (area, share)) in areas.iter().zip(shares).enumerate() {
                let target = share * frame.unit_area;
                let off = (area - target).abs() / target;
                if off > tolerance {
                    return Attempt::Retryable(format!("zone {room} area off by {:.1}%", off * 100.0));
                }
            }
        }

        let zones = dissolved.iter().map(|p| frame.to_world(p)).collect();
        let roads = chain_walls(&complex.walls).iter().map(|l| frame.to_world(l)).collect();
        Attempt::Success((zones, roads))
    }
}

fn check_ratios(ratios: &[(String, f64)]) -> Result<()> {
    if ratios.is_empty() {
        return Err(PlannerError::ConstraintViolation("split needs at least one zone".into()));
    }
    if let Some((name, ratio)) = ratios.iter().find(|(_, r)| !r.is_finite() || *r <= 0.0) {
        return Err(PlannerError::ConstraintViolation(format!("ratio of \"{name}\" must be positive, got {ratio}")));
    }
    Ok(())
}

/// Poisson-disk seeds, shrinking the radius until there is at least one per
/// zone.
fn seed_sites<R: Rng + ?Sized>(unit: &Polygon<f64>, radius: f64, zones: usize, rng: &mut R) -> Vec<Coord<f64>> {
    let mut radius = radius;
    let mut sites = poisson_seed(unit, radius, rng);
    for _ in 0..8 {
        if sites.len() >= zones {
            break;
        }
        radius *= RADIUS_SHRINK;
        sites = poisson_seed(unit, radius, rng);
    }
    sites
}

fn polygon_wkt(polygon: &Polygon<f64>) -> String {
    let ring = |ls: &LineString<f64>| {
        let coords: Vec<String> = ls.coords().map(|c| format!("{} {}", c.x, c.y)).collect();
        format!("({})", coords.join(", "))
    };
    let rings: Vec<String> = std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(ring).collect();
    format!("POLYGON ({})", rings.join(", "))
}
