use thiserror::Error;

/// Errors surfaced by the planner.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlannerError {
    /// The partition solver never produced a valid split within the attempt budget.
    #[error(
        "polygon split failed after {attempts} attempts ({reason}): ratios={ratios:?}, seeds={seeds}, radius={radius}, polygon={polygon}"
    )]
    SolverDivergence {
        attempts: usize,
        reason: String,
        ratios: Vec<(String, f64)>,
        seeds: usize,
        radius: f64,
        polygon: String,
    },

    /// No zone survived minimum-area filtering.
    #[error("no zone fits into {area:.0} m² (smallest required {required:.0} m²): {context}")]
    InfeasibleZoning { area: f64, required: f64, context: String },

    /// Caller input contradicts the zoning catalog or the territory.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The zone assignment program has no solution.
    #[error("zone assignment infeasible: {0}")]
    AssignmentInfeasible(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("projection error: {0}")]
    Projection(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// A task panicked inside a worker.
    #[error("worker panicked while running {task}: {message}")]
    WorkerPanic { task: String, message: String },
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Outcome of one randomized attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    /// Worth trying again with fresh randomness.
    Retryable(String),
    /// Retrying cannot help.
    Fatal(PlannerError),
}

/// Run `attempt` up to `budget` times, stopping at the first success or fatal
/// failure.  On exhaustion `exhausted` receives the attempt count and the
/// last retryable reason.
pub fn retry_bounded<T>(
    budget: usize,
    mut attempt: impl FnMut(usize) -> Attempt<T>,
    exhausted: impl FnOnce(usize, String) -> PlannerError,
) -> Result<T> {
    let mut last = String::from("no attempt made");
    for i in 0..budget {
        match attempt(i) {
            Attempt::Success(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(err),
            Attempt::Retryable(reason) => {
                tracing::debug!(attempt = i + 1, budget, %reason, "retrying");
                last = reason;
            }
        }
    }
    Err(exhausted(budget, last))
}
