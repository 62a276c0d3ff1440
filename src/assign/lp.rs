use good_lp::{Expression, Solution, SolverModel, Variable, constraint, default_solver, variable, variables};

use crate::error::{PlannerError, Result};

/// Area allocation of zones over disjoint features.
#[derive(Clone, Debug, Default)]
pub struct AssignmentProblem {
    /// Area of each feature.
    pub capacities: Vec<f64>,
    /// Minimum block area of each zone; a shortfall is penalized, not forbidden.
    pub min_areas: Vec<f64>,
    /// Total area each zone must receive.
    pub targets: Vec<f64>,
    /// `(feature, zone)` pairs allowed to carry area.
    pub permitted: Vec<(usize, usize)>,
}

/// Area of one zone placed on one feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub feature: usize,
    pub zone: usize,
    pub area: f64,
}

impl AssignmentProblem {
    fn check(&self) -> Result<()> {
        if self.min_areas.len() != self.targets.len() {
            return Err(PlannerError::AssignmentInfeasible(format!(
                "{} zone minimums for {} zone targets",
                self.min_areas.len(),
                self.targets.len()
            )));
        }
        if let Some(&(f, z)) = self.permitted.iter().find(|(f, z)| *f >= self.capacities.len() || *z >= self.targets.len()) {
            return Err(PlannerError::AssignmentInfeasible(format!("pair ({f}, {z}) out of range")));
        }
        if let Some(z) = (0..self.targets.len()).find(|&z| self.targets[z] > 0.0 && !self.permitted.iter().any(|p| p.1 == z)) {
            return Err(PlannerError::AssignmentInfeasible(format!("zone {z} has no candidate feature")));
        }
        Ok(())
    }
}

/// Solve the allocation as a mixed-integer program.
///
/// Per pair `(f, z)`: area `x ≥ 0`, presence `y ∈ {0, 1}`, slack `s ≥ 0` with
/// `x + s ≥ min_area(z)·y` and `x ≤ capacity(f)·y`.  Per feature the
/// allocated area stays within its capacity, per zone it reaches the target.
/// Total slack is minimized.
pub fn solve_assignment(problem: &AssignmentProblem) -> Result<Vec<Allocation>> {
    problem.check()?;
    let pairs = &problem.permitted;

    let mut vars = variables!();
    let x: Vec<Variable> = pairs.iter().map(|_| vars.add(variable().min(0.0))).collect();
    let y: Vec<Variable> = pairs.iter().map(|_| vars.add(variable().binary())).collect();
    let slack: Vec<Variable> = pairs.iter().map(|_| vars.add(variable().min(0.0))).collect();

    let objective: Expression = slack.iter().copied().sum();
    let mut model = vars.minimise(objective).using(default_solver);

    for (f, &capacity) in problem.capacities.iter().enumerate() {
        let used: Expression = pairs.iter().zip(&x).filter(|((pf, _), _)| *pf == f).map(|(_, v)| *v).sum();
        model = model.with(constraint!(used <= capacity));
    }
    for (k, &(f, z)) in pairs.iter().enumerate() {
        let covered = x[k] + slack[k];
        let floor = problem.min_areas[z] * y[k];
        model = model.with(constraint!(covered >= floor));
        let ceiling = problem.capacities[f] * y[k];
        model = model.with(constraint!(x[k] <= ceiling));
    }
    for (z, &target) in problem.targets.iter().enumerate() {
        let placed: Expression = pairs.iter().zip(&x).filter(|((_, pz), _)| *pz == z).map(|(_, v)| *v).sum();
        model = model.with(constraint!(placed >= target));
    }

    let solution = model
        .solve()
        .map_err(|e| PlannerError::AssignmentInfeasible(format!("{e} ({} features, {} zones)", problem.capacities.len(), problem.targets.len())))?;

    let allocations: Vec<Allocation> = pairs
        .iter()
        .zip(&x)
        .filter_map(|(&(feature, zone), v)| {
            let area = (solution.value(*v) * 100.0).round() / 100.0;
            (area > 0.0).then_some(Allocation { feature, zone, area })
        })
        .collect();
    let total_slack: f64 = slack.iter().map(|s| solution.value(*s)).sum();
    tracing::debug!(pairs = pairs.len(), allocations = allocations.len(), total_slack, "zone assignment solved");
    Ok(allocations)
}
