//! Prompt template loading and rendering via `minijinja` (spec.md §1: actual
//! prompt wording is an external collaborator; this crate only renders
//! whatever templates an operator supplies).
//!
//! Templates are loaded from the filesystem (default: `templates/`) so
//! operators can tune prompt wording without recompiling. One shared
//! `system.j2` establishes the agent's footing across every job kind; one
//! `<task_kind>.j2` per [`TaskKind`] renders the user-turn body from that
//! job's request payload.

use std::collections::HashMap;

use minijinja::Environment;

use lf_types::TaskKind;

use crate::error::RunnerError;

/// The eight template files a complete `templates/` directory must carry,
/// one per [`TaskKind`] plus the shared `system.j2`.
const TASK_KIND_TEMPLATES: &[(TaskKind, &str)] = &[
    (TaskKind::PlayerIntent, "player_intent"),
    (TaskKind::PlayerClarifyDecision, "player_clarify_decision"),
    (TaskKind::PlayerP2cDirective, "player_p2c_directive"),
    (TaskKind::CharacterAction, "character_action"),
    (TaskKind::CharacterReaction, "character_reaction"),
    (TaskKind::ValidationSemantic, "validation_semantic"),
    (TaskKind::MemoryCorruptionRender, "memory_corruption_render"),
    (TaskKind::StanceExtraction, "stance_extraction"),
];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with the shared system template and
/// every task-kind template pre-loaded. Templates can be edited on disk and
/// picked up on the next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the job's footing.
    pub system: String,
    /// User message rendered from the job's request payload.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given
    /// directory.
    ///
    /// The directory must contain `system.j2` plus one `<kind>.j2` per
    /// [`TaskKind`] (see [`TASK_KIND_TEMPLATES`]).
    ///
    /// # Errors
    /// Returns [`RunnerError::Template`] if any required file is missing or
    /// malformed.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();

        let system_tpl = load_template(templates_dir, "system.j2")?;
        env.add_template_owned("system", system_tpl)
            .map_err(|e| RunnerError::Template(format!("failed to add system template: {e}")))?;

        for (_, name) in TASK_KIND_TEMPLATES {
            let tpl = load_template(templates_dir, &format!("{name}.j2"))?;
            env.add_template_owned((*name).to_string(), tpl)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }

        Ok(Self { env })
    }

    /// Render the prompt for one job of kind `kind`, given its request
    /// payload as context.
    ///
    /// # Errors
    /// Returns [`RunnerError::Template`] if `kind` has no registered
    /// template or rendering fails against `context`.
    pub fn render(
        &self,
        kind: TaskKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let name = template_name(kind);

        let system = self
            .env
            .get_template("system")
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}

fn template_name(kind: TaskKind) -> &'static str {
    TASK_KIND_TEMPLATES
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or("unknown", |(_, name)| name)
}

fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}

/// Default template bodies, used to seed a fresh `templates/` directory and
/// by tests so they don't depend on an operator-authored prompt pack.
#[must_use]
pub fn default_templates() -> HashMap<&'static str, &'static str> {
    let mut templates = HashMap::new();
    templates.insert(
        "system.j2",
        "You are assisting one seat at a tabletop game of Lasers & Feelings. \
         The GM alone adjudicates outcomes; you only ever describe intent.",
    );
    templates.insert(
        "player_intent.j2",
        "Narration: {{ narration }}\n\
         Memories: {% for m in memories %}{{ m.fact }}; {% endfor %}\n\
         Clarifications so far: {% for c in clarifications %}Q: {{ c.question }} A: {{ c.answer }}; {% endfor %}\n\
         Respond with JSON: {\"intent\": \"...\"}",
    );
    templates.insert(
        "player_clarify_decision.j2",
        "Narration: {{ narration }}\nRound: {{ round }}\n\
         Respond with JSON: {\"question\": \"...\" or null}",
    );
    templates.insert(
        "player_p2c_directive.j2",
        "Your strategic intent: {{ intent }}\n\
         Respond with JSON: {\"directive\": \"...\"}",
    );
    templates.insert(
        "character_action.j2",
        "Directive from your player: {{ directive }}\n\
         {% if previous_violations %}Previously flagged: {% for v in previous_violations %}{{ v }}; {% endfor %}{% endif %}\n\
         Describe only your attempt, never its outcome. \
         Respond with JSON: {\"text\": \"...\", \"task_type\": \"lasers\"|\"feelings\", \"is_prepared\": bool, \"is_expert\": bool, \"is_helping\": bool, \"helping_character_id\": \"...\"|null, \"justification\": \"...\"}",
    );
    templates.insert(
        "character_reaction.j2",
        "Outcome: {{ outcome }}\nGM narration: {{ outcome_narration }}\n\
         Respond with JSON: {\"reaction\": \"...\"}",
    );
    templates.insert(
        "validation_semantic.j2",
        "Action text: {{ action_text }}\n\
         Candidate findings: {% for f in findings %}{{ f.matched_text }}; {% endfor %}\n\
         Which findings are genuine narrative overreach in context, versus quoted dialogue or a hypothetical? \
         Respond with JSON: {\"genuine_matched_text\": [\"...\"]}",
    );
    templates.insert(
        "memory_corruption_render.j2",
        "Pristine fact: {{ fact }}\nDegradation type: {{ kind }}\n\
         Produce a subtle, plausible degraded restatement of similar length. \
         Respond with JSON: {\"corrupted_fact\": \"...\"}",
    );
    templates.insert(
        "stance_extraction.j2",
        "OOC transcript: {{ ooc_text }}\n\
         Classify this agent's stance. Respond with JSON: {\"stance\": \"agree\"|\"disagree\"|\"neutral\"|\"silent\", \"confidence\": 0.0-1.0}",
    );
    templates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_default_templates(dir: &std::path::Path) {
        for (name, body) in default_templates() {
            std::fs::write(dir.join(name), body).expect("write template");
        }
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!("lf_worker_test_{tag}_{}_{:?}", std::process::id(), std::thread::current().id());
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn loads_all_task_kind_templates() {
        let dir = temp_dir("load_all");
        write_default_templates(&dir);
        let engine = PromptEngine::new(dir.to_str().expect("utf8 path"));
        assert!(engine.is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn renders_player_intent_with_context() {
        let dir = temp_dir("render_intent");
        write_default_templates(&dir);
        let engine = PromptEngine::new(dir.to_str().expect("utf8 path")).expect("loads");

        let context = serde_json::json!({
            "agent_id": "agent_alex",
            "narration": "A console flickers.",
            "memories": [],
            "clarifications": [],
        });
        let rendered = engine
            .render(TaskKind::PlayerIntent, &context)
            .expect("renders");
        assert!(rendered.user.contains("A console flickers."));
        assert!(rendered.system.contains("GM alone adjudicates"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_directory_errors() {
        let result = PromptEngine::new("/nonexistent/lf-worker-templates");
        assert!(result.is_err());
    }
}
