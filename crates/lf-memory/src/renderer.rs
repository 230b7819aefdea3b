//! The corruption-rendering port (spec.md §4.7).
//!
//! Producing a corrupted fact's text is an LLM call in production,
//! dispatched through `lf-worker`'s `TaskKind::MemoryCorruption`. This
//! crate depends only on the [`CorruptionRenderer`] trait so it stays free
//! of any LLM client.

use lf_types::CorruptionType;

/// Render a subtle, plausible degradation of a pristine fact.
pub trait CorruptionRenderer {
    /// Produce degraded text for `fact` matching `kind`.
    ///
    /// Implementations should keep the result a similar length to the
    /// input and avoid contradicting details that the corruption `kind`
    /// doesn't target.
    fn corrupt(
        &self,
        fact: &str,
        kind: CorruptionType,
    ) -> impl std::future::Future<Output = String> + Send;
}

/// A renderer that returns the fact unchanged, tagged with its corruption
/// kind. Used in tests and as a placeholder until a worker-backed renderer
/// is wired in.
pub struct IdentityRenderer;

impl CorruptionRenderer for IdentityRenderer {
    async fn corrupt(&self, fact: &str, kind: CorruptionType) -> String {
        format!("{fact} [{kind:?}]")
    }
}
