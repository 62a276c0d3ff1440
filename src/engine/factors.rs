use smallvec::{SmallVec, smallvec};

use crate::config::PlannerConfig;

/// Branching factor per level of a zone's block split, and the road width
/// laid at each level.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockPlan {
    pub factors: SmallVec<[usize; 4]>,
    pub widths: SmallVec<[f64; 4]>,
}

impl BlockPlan {
    pub fn new(area: f64, min_block_area: f64, config: &PlannerConfig) -> Self {
        let factors = block_factors(area, min_block_area, config.max_split_factor);
        if factors.is_empty() {
            return Self { factors: smallvec![1], widths: smallvec![config.road_widths.local_road] };
        }
        let widths = linspace(config.block_road_width, config.road_widths.local_road, factors.len());
        Self { factors, widths }
    }

    /// Number of levels.
    #[inline] pub fn depth(&self) -> usize { self.factors.len() }
}

/// Split factors, each at most `max_factor`, whose product times
/// `min_block_area` reaches `area` with little overshoot.
///
/// Starts from `[max_factor; k]` with the smallest `k` covering `area`, then
/// lowers factors front to back while the product overshoots, and finally
/// undoes the last lowering if it fell short.  The lowering is greedy: once
/// it moves past a level that level stays fixed, so the product is not always
/// the smallest one covering `area` (`A/m = 40` gives `[2, 4, 6]`, not
/// `[2, 4, 5]`).  Empty when a single block already covers `area`.
pub fn block_factors(area: f64, min_block_area: f64, max_factor: usize) -> SmallVec<[usize; 4]> {
    let mut factors: SmallVec<[usize; 4]> = SmallVec::new();
    if min_block_area.is_nan() || min_block_area <= 0.0 || !area.is_finite() {
        return factors;
    }
    let max_factor = max_factor.max(2);

    let mut reach = min_block_area;
    while reach < area {
        reach *= max_factor as f64;
        factors.push(max_factor);
    }
    if factors.is_empty() {
        return factors;
    }

    let floor = if factors.len() == 1 { 1 } else { 2 };
    let mut i = 0;
    while reach > area && i < factors.len() {
        if factors[i] > floor {
            factors[i] -= 1;
        } else {
            i += 1;
        }
        reach = min_block_area * factors.iter().product::<usize>() as f64;
    }
    if reach < area && i < factors.len() {
        factors[i] += 1;
    }
    factors
}

fn linspace(start: f64, end: f64, n: usize) -> SmallVec<[f64; 4]> {
    match n {
        0 => SmallVec::new(),
        1 => smallvec![start],
        _ => (0..n).map(|k| start + (end - start) * k as f64 / (n - 1) as f64).collect(),
    }
}
