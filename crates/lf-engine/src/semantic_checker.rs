//! Worker-backed [`SemanticChecker`] (spec.md §4.5).
//!
//! Suppressing a pattern match that is contextually fine (quoted dialogue,
//! a hypothetical) is an LLM judgment call; this adapter dispatches it
//! through [`WorkerDispatch`], tagged `TaskKind::ValidationSemantic`.
//!
//! [`SemanticChecker::filter_genuine`] is infallible by contract. On
//! dispatch failure this checker fails closed -- every pattern match is
//! treated as genuine overreach -- rather than silently letting an
//! unreviewed action through, the opposite default from
//! [`crate::corruption_renderer::WorkerCorruptionRenderer`] because here the
//! invariant being protected (no character narrates its own outcome) is the
//! one spec.md treats as non-negotiable.

use uuid::Uuid;

use lf_core::jobs;
use lf_core::worker_dispatch::WorkerDispatch;
use lf_types::TaskKind;
use lf_validation::{Finding, SemanticChecker};
use tracing::warn;

/// A session id used for validation-semantic jobs, which are not scoped to
/// a particular session's turn loop beyond the text being judged. See
/// [`crate::corruption_renderer::WorkerCorruptionRenderer`]'s doc comment
/// for why a fixed id is safe here.
const BACKGROUND_SESSION_ID: Uuid = Uuid::nil();

/// Suppresses false-positive pattern matches by dispatching to the worker pool.
pub struct WorkerSemanticChecker<W> {
    dispatch: W,
}

impl<W: WorkerDispatch> WorkerSemanticChecker<W> {
    /// Wrap a worker dispatch client as a semantic checker.
    #[must_use]
    pub const fn new(dispatch: W) -> Self {
        Self { dispatch }
    }
}

impl<W: WorkerDispatch + Sync> SemanticChecker for WorkerSemanticChecker<W> {
    async fn filter_genuine(&self, action_text: &str, findings: &[Finding]) -> Vec<Finding> {
        match self.check(action_text, findings).await {
            Ok(genuine) => genuine,
            Err(err) => {
                warn!(error = %err, "validation semantic check failed, treating all findings as genuine");
                findings.to_vec()
            }
        }
    }
}

impl<W: WorkerDispatch> WorkerSemanticChecker<W> {
    async fn check(
        &self,
        action_text: &str,
        findings: &[Finding],
    ) -> Result<Vec<Finding>, lf_core::error::PhaseError> {
        if findings.is_empty() {
            return Ok(Vec::new());
        }

        let request = jobs::ValidationSemanticRequest {
            action_text: action_text.to_string(),
            findings: findings.to_vec(),
        };
        let job = jobs::build_job(TaskKind::ValidationSemantic, &request)?;
        let job_id = self.dispatch.enqueue(BACKGROUND_SESSION_ID, job).await?;
        let outcome = self.dispatch.await_result(job_id).await?;
        let response: jobs::ValidationSemanticResponse =
            jobs::parse_result(&outcome, lf_types::Phase::Validation)?;

        Ok(findings
            .iter()
            .filter(|finding| response.genuine_matched_text.contains(&finding.matched_text))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::worker_dispatch::{JobOutcome, JobSpec};
    use lf_types::JobId;
    use lf_validation::OverreachCategory;

    fn finding(matched_text: &str) -> Finding {
        Finding {
            category: OverreachCategory::OutcomeVerb,
            matched_text: matched_text.to_string(),
            start: 0,
            end: matched_text.len(),
        }
    }

    struct FailingDispatch;

    impl WorkerDispatch for FailingDispatch {
        async fn enqueue(&self, _session_id: Uuid, _job: JobSpec) -> Result<JobId, lf_core::error::PhaseError> {
            Err(lf_core::error::PhaseError::Transient {
                phase: lf_types::Phase::Validation,
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

    struct SuppressAllDispatch;

    impl WorkerDispatch for SuppressAllDispatch {
        async fn enqueue(&self, _session_id: Uuid, _job: JobSpec) -> Result<JobId, lf_core::error::PhaseError> {
            Ok(JobId::new())
        }

        async fn await_result(&self, _job_id: JobId) -> Result<JobOutcome, lf_core::error::PhaseError> {
            let response = jobs::ValidationSemanticResponse {
                genuine_matched_text: Vec::new(),
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
    async fn dispatch_failure_fails_closed_treating_all_as_genuine() {
        let checker = WorkerSemanticChecker::new(FailingDispatch);
        let findings = vec![finding("it dies")];
        let genuine = checker.filter_genuine("I swing; it dies.", &findings).await;
        assert_eq!(genuine, findings);
    }

    #[tokio::test]
    async fn empty_findings_short_circuits_without_dispatching() {
        let checker = WorkerSemanticChecker::new(FailingDispatch);
        let genuine = checker.filter_genuine("I study the console.", &[]).await;
        assert!(genuine.is_empty());
    }

    #[tokio::test]
    async fn worker_can_suppress_a_finding_in_context() {
        let checker = WorkerSemanticChecker::new(SuppressAllDispatch);
        let findings = vec![finding("it dies")];
        let genuine = checker.filter_genuine("The NPC says \"it dies\" ominously.", &findings).await;
        assert!(genuine.is_empty());
    }
}
