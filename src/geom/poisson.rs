use std::f64::consts::{SQRT_2, TAU};

use geo::{BoundingRect, Contains, Coord, Polygon};
use rand::Rng;

/// Candidates tried around each active sample before it is retired.
const CANDIDATES: usize = 30;

/// Blue-noise points inside `polygon`, no two closer than `radius`
/// (Bridson's algorithm over the polygon's envelope).
pub fn poisson_seed<R: Rng + ?Sized>(polygon: &Polygon<f64>, radius: f64, rng: &mut R) -> Vec<Coord<f64>> {
    let Some(bbox) = polygon.bounding_rect() else { return Vec::new() };
    if radius <= 0.0 || !radius.is_finite() {
        return Vec::new();
    }
    let (min, max) = (bbox.min(), bbox.max());

    let cell = radius / SQRT_2;
    let grid_w = ((max.x - min.x) / cell).floor() as usize + 1;
    let grid_h = ((max.y - min.y) / cell).floor() as usize + 1;
    let mut grid: Vec<Option<usize>> = vec![None; grid_w * grid_h];
    let slot = |c: Coord<f64>| {
        let gx = (((c.x - min.x) / cell) as usize).min(grid_w - 1);
        let gy = (((c.y - min.y) / cell) as usize).min(grid_h - 1);
        (gx, gy)
    };

    let mut samples: Vec<Coord<f64>> = Vec::new();
    let mut active: Vec<usize> = Vec::new();

    let sample_range = |rng: &mut R, lo: f64, hi: f64| if hi > lo { rng.random_range(lo..hi) } else { lo };

    // Seed with a random interior point; give up on slivers we cannot hit.
    for _ in 0..1_000 {
        let c = Coord { x: sample_range(rng, min.x, max.x), y: sample_range(rng, min.y, max.y) };
        if polygon.contains(&c) {
            let (gx, gy) = slot(c);
            grid[gy * grid_w + gx] = Some(0);
            samples.push(c);
            active.push(0);
            break;
        }
    }

    while !active.is_empty() {
        let pick = rng.random_range(0..active.len());
        let base = samples[active[pick]];
        let mut found = false;

        for _ in 0..CANDIDATES {
            let angle = rng.random_range(0.0..TAU);
            let dist = rng.random_range(radius..2.0 * radius);
            let c = Coord { x: base.x + dist * angle.cos(), y: base.y + dist * angle.sin() };
            if c.x < min.x || c.x > max.x || c.y < min.y || c.y > max.y || !polygon.contains(&c) {
                continue;
            }

            let (gx, gy) = slot(c);
            let far_enough = (gy.saturating_sub(2)..=(gy + 2).min(grid_h - 1)).all(|y| {
                (gx.saturating_sub(2)..=(gx + 2).min(grid_w - 1)).all(|x| match grid[y * grid_w + x] {
                    Some(j) => (samples[j].x - c.x).powi(2) + (samples[j].y - c.y).powi(2) >= radius * radius,
                    None => true,
                })
            });
            if far_enough {
                grid[gy * grid_w + gx] = Some(samples.len());
                active.push(samples.len());
                samples.push(c);
                found = true;
                break;
            }
        }

        if !found {
            active.swap_remove(pick);
        }
    }

    samples
}
