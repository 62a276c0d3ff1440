//! Recursive decomposition: tasks, what each one does, and the scheduler
//! that drains them.

mod factors;
mod ops;
mod scheduler;
mod task;

pub use factors::{BlockPlan, block_factors};
pub use ops::{EngineContext, HIGH_SPEED_HIGHWAY, LOCAL_ROAD, REGULATED_HIGHWAY, UNDEFINED_ROAD, run_task};
pub use scheduler::{Scheduler, Workers};
pub use task::{Job, Task, TaskOutcome};
