//! The worker-pool dispatch port (spec.md §4.4, §6.3).
//!
//! `lf-core` never depends on `lf-worker` directly -- `lf-engine` wires a
//! client adapter implementing [`WorkerDispatch`] around `lf-worker`'s NATS
//! client, so the phase machine is testable with an in-memory fake and the
//! two crates compile independently of each other.

use serde_json::Value;

use lf_types::{JobId, JobStatus, TaskKind};

use crate::error::PhaseError;

/// One unit of LLM-backed or deterministic work fanned out to the worker
/// pool (spec.md §4.4: each phase's agent-parallel steps enqueue one job
/// per agent or character).
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// What kind of work this job performs.
    pub kind: TaskKind,
    /// The per-job payload (rendered prompt context, corruption input, etc).
    pub payload: Value,
}

/// The outcome of one dispatched job, once it reaches a terminal status.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// The job's terminal lifecycle status.
    pub status: JobStatus,
    /// The job's result payload, present only when `status` is `Finished`.
    pub result: Option<Value>,
    /// A diagnostic, present only when `status` is `Failed`.
    pub failure: Option<String>,
}

/// Dispatch port the phase machine uses to fan work out to the worker
/// pool and await results (spec.md §4.4, §6.3 worker registry).
///
/// Each job carries its own 2-minute individual timeout (spec.md §4.1);
/// a phase's overall deadline is simply the wall-clock time its jobs take,
/// unbounded at this layer.
pub trait WorkerDispatch: Send + Sync {
    /// Enqueue one job and return its assigned id.
    fn enqueue(
        &self,
        session_id: uuid::Uuid,
        job: JobSpec,
    ) -> impl Future<Output = Result<JobId, PhaseError>> + Send;

    /// Block until `job_id` reaches a terminal status, applying the job's
    /// own retry budget internally (spec.md §7 `Transient`: swallowed by
    /// the worker up to its retry budget before this ever returns `Failed`).
    fn await_result(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<JobOutcome, PhaseError>> + Send;

    /// Requeue `session_id`'s abandoned jobs -- rows a worker claimed
    /// (`Started`) but never finished, typically because the worker process
    /// crashed mid-call -- and return the ids redelivered (spec.md §4.4
    /// `recover(session_id) -> list[job_id]`).
    ///
    /// This is the crash-recovery half of the worker pool's responsibility;
    /// it is distinct from `abort_turn`'s cooperative cancellation of
    /// jobs still in flight for a turn that is being rolled back (spec.md
    /// §6.1), which the state machine implements separately via
    /// `SessionControl`.
    fn recover(&self, session_id: uuid::Uuid) -> impl Future<Output = Result<Vec<JobId>, PhaseError>> + Send;
}
