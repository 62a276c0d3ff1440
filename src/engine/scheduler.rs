use std::{
    any::Any,
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, mpsc},
};

use super::{EngineContext, Task, TaskOutcome, run_task};
use crate::error::{PlannerError, Result};
use crate::table::Generation;

/// How tasks are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workers {
    /// Everything on the calling thread, one task at a time.
    Inline,
    /// A pool of this many threads; `0` means one per core.
    Pool(usize),
}

impl Default for Workers {
    fn default() -> Self {
        Workers::Pool(0)
    }
}

/// Drains a growing queue of tasks, keeping at most `capacity` in flight.
///
/// Only the scheduler thread touches the queue and the accumulated rows;
/// workers get a task by value and send back its outcome.
pub struct Scheduler {
    workers: Workers,
}

type Finished = (String, std::thread::Result<Result<TaskOutcome>>);

impl Scheduler {
    pub fn new(workers: Workers) -> Self {
        Self { workers }
    }

    /// Run `roots` and everything they expand into.
    pub fn run(&self, roots: Vec<Task>, ctx: Arc<EngineContext>) -> Result<Generation> {
        match self.workers {
            Workers::Inline => self.run_inline(roots, &ctx),
            Workers::Pool(threads) => self.run_pool(roots, ctx, threads),
        }
    }

    fn run_inline(&self, roots: Vec<Task>, ctx: &EngineContext) -> Result<Generation> {
        let mut queue = VecDeque::from(roots);
        let mut harvest = Harvest::default();
        while let Some(task) = queue.pop_front() {
            let name = task.describe();
            let result = catch_unwind(AssertUnwindSafe(|| run_task(task, ctx)));
            harvest.absorb(name, result, &mut queue)?;
        }
        Ok(harvest.finish())
    }

    fn run_pool(&self, roots: Vec<Task>, ctx: Arc<EngineContext>, threads: usize) -> Result<Generation> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("genplanner-worker-{i}"))
            .build()
            .map_err(|e| PlannerError::WorkerPool(e.to_string()))?;
        let capacity = pool.current_num_threads().max(1);
        tracing::debug!(capacity, "worker pool started");

        let (tx, rx) = mpsc::channel::<Finished>();
        let mut queue = VecDeque::from(roots);
        let mut harvest = Harvest::default();
        let mut in_flight = 0usize;

        loop {
            while in_flight < capacity {
                let Some(task) = queue.pop_front() else { break };
                let (tx, ctx) = (tx.clone(), Arc::clone(&ctx));
                let name = task.describe();
                tracing::trace!(task = %name, queued = queue.len(), "dispatch");
                pool.spawn(move || {
                    let result = catch_unwind(AssertUnwindSafe(|| run_task(task, &ctx)));
                    // the receiver is gone only when the run already failed
                    let _ = tx.send((name, result));
                });
                in_flight += 1;
            }
            if in_flight == 0 {
                break;
            }

            let (name, result) = rx.recv().map_err(|e| PlannerError::WorkerPool(e.to_string()))?;
            in_flight -= 1;
            harvest.absorb(name, result, &mut queue)?;
        }
        Ok(harvest.finish())
    }
}

/// Rows collected so far.
#[derive(Default)]
struct Harvest {
    generation: Generation,
    tasks: usize,
}

impl Harvest {
    fn absorb(
        &mut self,
        name: String,
        result: std::thread::Result<Result<TaskOutcome>>,
        queue: &mut VecDeque<Task>,
    ) -> Result<()> {
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::warn!(task = %name, %err, "task failed");
                return Err(err);
            }
            Err(payload) => {
                return Err(PlannerError::WorkerPanic { task: name, message: panic_message(payload.as_ref()) });
            }
        };
        self.tasks += 1;
        tracing::trace!(
            task = %name,
            zones = outcome.zones.len(),
            children = outcome.children.len(),
            roads = outcome.roads.len(),
            "complete"
        );
        self.generation.zones.extend(outcome.zones);
        self.generation.roads.extend(outcome.roads);
        queue.extend(outcome.children);
        Ok(())
    }

    fn finish(self) -> Generation {
        tracing::debug!(
            tasks = self.tasks,
            zones = self.generation.zones.len(),
            roads = self.generation.roads.len(),
            "queue drained"
        );
        self.generation
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use geo::{Area, polygon};

    use super::*;
    use crate::config::PlannerConfig;
    use crate::engine::Job;
    use crate::solver::{CellComplex, PartitionSolver, PowerDiagramAdapter, SolverFailure, SolverInput};
    use crate::table::Labels;
    use crate::zoning::TerritoryZone;

    fn square(side: f64) -> geo::Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: side, y: 0.0), (x: side, y: side), (x: 0.0, y: side)]
    }

    fn context(solver: Arc<dyn PartitionSolver>) -> Arc<EngineContext> {
        Arc::new(EngineContext::new(PlannerConfig::default(), solver))
    }

    fn blocks_task(side: f64, min_block_area: f64) -> Task {
        let job = Job::ZoneToBlocks { polygon: square(side), zone: TerritoryZone::new("residential", min_block_area) };
        Task::new(job, Labels::default().with_func_zone("basic"), 17)
    }

    #[test]
    fn small_zone_is_one_block() {
        let ctx = context(Arc::new(PowerDiagramAdapter::default()));
        let generation = Scheduler::new(Workers::Inline).run(vec![blocks_task(90.0, 10_000.0)], ctx).unwrap();
        assert_eq!(generation.zones.len(), 1);
        assert!(generation.roads.is_empty());
        assert_eq!(generation.zones[0].labels.territory_zone.as_deref(), Some("residential"));
    }

    #[test]
    fn blocks_respect_minimum_area_in_a_pool() {
        // 55 000 m² with 10 000 m² blocks: the single level asks for six, but
        // blocks are capped at the five that fit the minimum area
        let ctx = context(Arc::new(PowerDiagramAdapter::default()));
        let side = 55_000f64.sqrt();
        let generation = Scheduler::new(Workers::Pool(2)).run(vec![blocks_task(side, 10_000.0)], ctx).unwrap();

        assert_eq!(generation.zones.len(), 5);
        let total: f64 = generation.zones.iter().map(|z| z.geometry.unsigned_area()).sum();
        assert!((total - 55_000.0).abs() <= 5_500.0);
        assert!(generation.roads.iter().all(|r| r.level == "local road, level 1" && r.width == 13.0));
        assert!(generation.zones.iter().all(|z| z.labels.func_zone.as_deref() == Some("basic")));
    }

    #[test]
    fn two_level_split_expands_children() {
        let ctx = context(Arc::new(PowerDiagramAdapter::default()));
        let generation = Scheduler::new(Workers::Pool(0)).run(vec![blocks_task(400.0, 10_000.0)], ctx).unwrap();

        assert!(generation.zones.len() > 6, "{} blocks", generation.zones.len());
        let levels: std::collections::BTreeSet<&str> = generation.roads.iter().map(|r| r.level.as_str()).collect();
        assert!(levels.contains("local road, level 1"));
        assert!(levels.contains("local road, level 2"));
    }

    struct Panicking;

    impl PartitionSolver for Panicking {
        fn solve(&self, _input: &SolverInput) -> std::result::Result<CellComplex, SolverFailure> {
            panic!("solver blew up")
        }
    }

    #[test]
    fn worker_panic_is_reported() {
        for workers in [Workers::Inline, Workers::Pool(2)] {
            let err = Scheduler::new(workers).run(vec![blocks_task(400.0, 10_000.0)], context(Arc::new(Panicking))).unwrap_err();
            match err {
                PlannerError::WorkerPanic { task, message } => {
                    assert!(task.starts_with("zone_to_blocks"), "{task}");
                    assert_eq!(message, "solver blew up");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn panic_payloads_become_text() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let number: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(number.as_ref()), "non-string panic payload");
    }
}
