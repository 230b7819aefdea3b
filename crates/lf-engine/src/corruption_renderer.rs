//! Worker-backed [`CorruptionRenderer`] (spec.md §4.7).
//!
//! Rendering a corrupted fact's text is an LLM call; this adapter dispatches
//! it through the same [`WorkerDispatch`] port `lf-core`'s phase machine uses
//! for every other job kind, tagged `TaskKind::MemoryCorruptionRender`.
//!
//! [`CorruptionRenderer::corrupt`] is infallible by contract -- a memory read
//! must always return *something* -- so a dispatch failure here degrades to
//! the pristine fact text rather than propagating an error, mirroring the
//! best-effort Dragonfly mirroring in [`crate::events`].

use uuid::Uuid;

use lf_core::jobs;
use lf_core::worker_dispatch::WorkerDispatch;
use lf_memory::renderer::CorruptionRenderer;
use lf_types::{CorruptionType, TaskKind};
use tracing::warn;

/// A session id used for corruption-render jobs, which are not scoped to a
/// particular session's turn loop: the rendered text depends only on the
/// fact and the corruption kind. Using a fixed id keeps these jobs out of
/// any one session's abandoned-job recovery sweep, which is harmless since
/// this renderer already degrades gracefully on failure.
const BACKGROUND_SESSION_ID: Uuid = Uuid::nil();

/// Renders corrupted memory fact text by dispatching to the worker pool.
pub struct WorkerCorruptionRenderer<W> {
    dispatch: W,
}

impl<W: WorkerDispatch> WorkerCorruptionRenderer<W> {
    /// Wrap a worker dispatch client as a corruption renderer.
    #[must_use]
    pub const fn new(dispatch: W) -> Self {
        Self { dispatch }
    }
}

impl<W: WorkerDispatch + Sync> CorruptionRenderer for WorkerCorruptionRenderer<W> {
    async fn corrupt(&self, fact: &str, kind: CorruptionType) -> String {
        match self.render(fact, kind).await {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(error = %err, ?kind, "corruption render job failed, returning pristine fact");
                fact.to_string()
            }
        }
    }
}

impl<W: WorkerDispatch> WorkerCorruptionRenderer<W> {
    async fn render(&self, fact: &str, kind: CorruptionType) -> Result<String, lf_core::error::PhaseError> {
        let request = jobs::MemoryCorruptionRenderRequest {
            fact: fact.to_string(),
            kind,
        };
        let job = jobs::build_job(TaskKind::MemoryCorruptionRender, &request)?;
        let job_id = self.dispatch.enqueue(BACKGROUND_SESSION_ID, job).await?;
        let outcome = self.dispatch.await_result(job_id).await?;
        let response: jobs::MemoryCorruptionRenderResponse =
            jobs::parse_result(&outcome, lf_types::Phase::MemoryRetrieval)?;
        Ok(response.corrupted_fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::worker_dispatch::{JobOutcome, JobSpec};
    use lf_types::JobId;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingDispatch;

    impl WorkerDispatch for FailingDispatch {
        async fn enqueue(&self, _session_id: Uuid, _job: JobSpec) -> Result<JobId, lf_core::error::PhaseError> {
            Err(lf_core::error::PhaseError::Transient {
                phase: lf_types::Phase::MemoryRetrieval,
                message: "queue unreachable".to_string(),
            })
        }

        async fn await_result(&self, _job_id: JobId) -> Result<JobOutcome, lf_core::error::PhaseError> {
            unreachable!("enqueue always fails first in this fake")
        }

        async fn recover(&self, _session_id: Uuid) -> Result<Vec<JobId>, lf_core::error::PhaseError> {
            Ok(Vec::new())
        }
    }

    struct EchoDispatch {
        called: AtomicBool,
    }

    impl WorkerDispatch for EchoDispatch {
        async fn enqueue(&self, _session_id: Uuid, _job: JobSpec) -> Result<JobId, lf_core::error::PhaseError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(JobId::new())
        }

        async fn await_result(&self, _job_id: JobId) -> Result<JobOutcome, lf_core::error::PhaseError> {
            let response = jobs::MemoryCorruptionRenderResponse {
                corrupted_fact: "a blurred memory".to_string(),
            };
            Ok(JobOutcome {
                status: lf_types::JobStatus::Finished,
                result: Some(serde_json::to_value(response).expect("serializes")),
                failure: None,
            })
        }

        async fn recover(&self, _session_id: Uuid) -> Result<Vec<JobId>, lf_core::error::PhaseError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn dispatch_failure_degrades_to_pristine_fact() {
        let renderer = WorkerCorruptionRenderer::new(FailingDispatch);
        let result = renderer.corrupt("The merchant offered 50 gold.", CorruptionType::Simplification).await;
        assert_eq!(result, "The merchant offered 50 gold.");
    }

    #[tokio::test]
    async fn successful_job_returns_rendered_text() {
        let renderer = WorkerCorruptionRenderer::new(EchoDispatch {
            called: AtomicBool::new(false),
        });
        let result = renderer.corrupt("The merchant offered 50 gold.", CorruptionType::Conflation).await;
        assert_eq!(result, "a blurred memory");
    }
}
