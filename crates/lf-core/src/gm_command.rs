//! GM command parsing and phase admissibility (spec.md §6.1).
//!
//! The GM adapter's HTTP/WebSocket boundary is out of scope here; this
//! module defines only the typed commands it must translate raw input
//! into, plus the admissibility rule the machine and adapter both consult.
//! A command outside its admissible phase never reaches [`crate::machine`]
//! -- the adapter rejects it directly with a structured notice so the GM
//! sees exactly one failure presentation (spec.md §7).

use lf_types::{CharacterId, Phase};

/// One GM command, already parsed out of raw adapter input.
///
/// `ask` is deliberately out-of-band: it never advances state and is
/// admissible in every phase, so the machine never sees it at all -- the
/// adapter answers it directly against the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GmCommand {
    /// `narrate <text>` -- only at [`Phase::DmNarration`].
    Narrate(String),
    /// `answer <id> <text>` -- only at [`Phase::DmClarificationWait`].
    Answer {
        /// The clarifying question this answers.
        question_id: String,
        /// The GM's answer text.
        text: String,
    },
    /// `finish` -- only at [`Phase::DmClarificationWait`]; forces the
    /// clarification loop to exit even with questions unanswered.
    Finish,
    /// `accept` -- only at [`Phase::DmAdjudication`]; approve the proposed
    /// roll as-is.
    Accept,
    /// `override <dice-spec>` -- only at [`Phase::DmAdjudication`]; the
    /// spec text is parsed later by `lf_dice::parse_override`.
    Override(String),
    /// `lf_answer <text>` -- only at [`Phase::LaserFeelingsQuestion`].
    LfAnswer(String),
    /// `success <text>` / `fail <text>` / `partial <text>` / `critical
    /// <text>` -- only at [`Phase::DmOutcome`].
    Outcome {
        /// The hinted outcome tier, or `None` if the GM used a bare
        /// narration command without a tier hint.
        tier: Option<OutcomeHint>,
        /// The outcome narration text.
        text: String,
    },
    /// `ask <character> <text>` -- any phase; out-of-band, does not
    /// advance state.
    Ask {
        /// The character being addressed.
        character: CharacterId,
        /// The GM's query text.
        text: String,
    },
    /// `end_session` -- any phase; persist and close.
    EndSession,
    /// `abort_turn` -- any in-flight phase; cancel outstanding jobs and
    /// roll back to `last_stable_phase`.
    AbortTurn,
}

/// The tier hint carried by a `dm_outcome` command.
///
/// Distinct from [`lf_types::Outcome`]: this is the GM's stated intent,
/// not the dice-derived tier, and the machine is free to record a
/// mismatch rather than silently overriding the roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeHint {
    /// `success <text>`.
    Success,
    /// `fail <text>`.
    Fail,
    /// `partial <text>`.
    Partial,
    /// `critical <text>`.
    Critical,
}

/// A command was well-formed but rejected outside its admissible phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command not admissible at {current:?}; acceptable: {acceptable:?}")]
pub struct AdmissibilityError {
    /// The phase the machine was actually in.
    pub current: Phase,
    /// The commands that would have been accepted instead.
    pub acceptable: Vec<&'static str>,
}

/// A raw GM input string could not be parsed into a [`GmCommand`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized GM command: {0}")]
pub struct ParseError(pub String);

impl GmCommand {
    /// This command's name, for admissibility error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Narrate(_) => "narrate",
            Self::Answer { .. } => "answer",
            Self::Finish => "finish",
            Self::Accept => "accept",
            Self::Override(_) => "override",
            Self::LfAnswer(_) => "lf_answer",
            Self::Outcome { .. } => "outcome",
            Self::Ask { .. } => "ask",
            Self::EndSession => "end_session",
            Self::AbortTurn => "abort_turn",
        }
    }

    /// Whether this command may be applied while the machine is at `current`.
    ///
    /// `ask`, `end_session`, and `abort_turn` are admissible everywhere
    /// (spec.md §6.1); every other command is admissible only at the one
    /// phase the table names.
    #[must_use]
    pub const fn is_admissible(&self, current: Phase) -> bool {
        match self {
            Self::Ask { .. } | Self::EndSession | Self::AbortTurn => true,
            Self::Narrate(_) => matches!(current, Phase::DmNarration),
            Self::Answer { .. } | Self::Finish => {
                matches!(current, Phase::DmClarificationWait)
            }
            Self::Accept | Self::Override(_) => matches!(current, Phase::DmAdjudication),
            Self::LfAnswer(_) => matches!(current, Phase::LaserFeelingsQuestion),
            Self::Outcome { .. } => matches!(current, Phase::DmOutcome),
        }
    }

    /// The command names admissible at `current`, for a rejection notice.
    #[must_use]
    pub fn acceptable_at(current: Phase) -> Vec<&'static str> {
        let mut acceptable = vec!["ask", "end_session", "abort_turn"];
        match current {
            Phase::DmNarration => acceptable.push("narrate"),
            Phase::DmClarificationWait => {
                acceptable.push("answer");
                acceptable.push("finish");
            }
            Phase::DmAdjudication => {
                acceptable.push("accept");
                acceptable.push("override");
            }
            Phase::LaserFeelingsQuestion => acceptable.push("lf_answer"),
            Phase::DmOutcome => acceptable.push("success/fail/partial/critical"),
            _ => {}
        }
        acceptable
    }

    /// Check admissibility, producing the structured rejection spec.md §7
    /// requires when it fails.
    ///
    /// # Errors
    /// Returns [`AdmissibilityError`] if `self` is not admissible at `current`.
    pub fn check_admissible(&self, current: Phase) -> Result<(), AdmissibilityError> {
        if self.is_admissible(current) {
            Ok(())
        } else {
            Err(AdmissibilityError {
                current,
                acceptable: Self::acceptable_at(current),
            })
        }
    }
}

/// Parse one line of raw GM adapter input into a [`GmCommand`].
///
/// # Errors
/// Returns [`ParseError`] if `raw` does not match any recognized command
/// form.
pub fn parse(raw: &str) -> Result<GmCommand, ParseError> {
    let raw = raw.trim();
    let (head, rest) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
    let rest = rest.trim();

    match head {
        "narrate" if !rest.is_empty() => Ok(GmCommand::Narrate(rest.to_string())),
        "finish" => Ok(GmCommand::Finish),
        "accept" => Ok(GmCommand::Accept),
        "override" if !rest.is_empty() => Ok(GmCommand::Override(rest.to_string())),
        "lf_answer" if !rest.is_empty() => Ok(GmCommand::LfAnswer(rest.to_string())),
        "end_session" => Ok(GmCommand::EndSession),
        "abort_turn" => Ok(GmCommand::AbortTurn),
        "answer" if !rest.is_empty() => {
            let (question_id, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| ParseError(raw.to_string()))?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ParseError(raw.to_string()));
            }
            Ok(GmCommand::Answer {
                question_id: question_id.to_string(),
                text: text.to_string(),
            })
        }
        "success" | "fail" | "partial" | "critical" if !rest.is_empty() => Ok(GmCommand::Outcome {
            tier: Some(match head {
                "success" => OutcomeHint::Success,
                "fail" => OutcomeHint::Fail,
                "partial" => OutcomeHint::Partial,
                _ => OutcomeHint::Critical,
            }),
            text: rest.to_string(),
        }),
        "ask" if !rest.is_empty() => {
            let (character, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| ParseError(raw.to_string()))?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ParseError(raw.to_string()));
            }
            let character = CharacterId::new(character).map_err(|_| ParseError(raw.to_string()))?;
            Ok(GmCommand::Ask {
                character,
                text: text.to_string(),
            })
        }
        _ => Err(ParseError(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_narrate() {
        assert_eq!(
            parse("narrate the fog rolls in").expect("parses"),
            GmCommand::Narrate("the fog rolls in".to_string())
        );
    }

    #[test]
    fn parses_answer() {
        let command = parse("answer q1 yes, the reactor is cold").expect("parses");
        assert_eq!(
            command,
            GmCommand::Answer {
                question_id: "q1".to_string(),
                text: "yes, the reactor is cold".to_string(),
            }
        );
    }

    #[test]
    fn parses_outcome_with_tier() {
        let command = parse("critical the console sparks and dies").expect("parses");
        assert_eq!(
            command,
            GmCommand::Outcome {
                tier: Some(OutcomeHint::Critical),
                text: "the console sparks and dies".to_string(),
            }
        );
    }

    #[test]
    fn parses_ask() {
        let command = parse("ask char_zara_7 what do you see").expect("parses");
        assert_eq!(
            command,
            GmCommand::Ask {
                character: CharacterId::new("char_zara_7").expect("valid"),
                text: "what do you see".to_string(),
            }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("frobnicate").is_err());
        assert!(parse("narrate").is_err());
    }

    #[test]
    fn admissibility_matches_table() {
        assert!(GmCommand::Narrate("x".into()).is_admissible(Phase::DmNarration));
        assert!(!GmCommand::Narrate("x".into()).is_admissible(Phase::DmAdjudication));

        assert!(GmCommand::Accept.is_admissible(Phase::DmAdjudication));
        assert!(GmCommand::Override("1d6".into()).is_admissible(Phase::DmAdjudication));
        assert!(!GmCommand::Accept.is_admissible(Phase::DmOutcome));

        assert!(GmCommand::LfAnswer("x".into()).is_admissible(Phase::LaserFeelingsQuestion));

        let outcome = GmCommand::Outcome {
            tier: Some(OutcomeHint::Success),
            text: "x".into(),
        };
        assert!(outcome.is_admissible(Phase::DmOutcome));
        assert!(!outcome.is_admissible(Phase::DmAdjudication));
    }

    #[test]
    fn universal_commands_admissible_everywhere() {
        for phase in [
            Phase::DmNarration,
            Phase::MemoryRetrieval,
            Phase::DmClarificationCollect,
            Phase::DmClarificationWait,
            Phase::SecondMemoryRetrieval,
            Phase::StrategicIntent,
            Phase::P2cDirective,
            Phase::CharacterAction,
            Phase::Validation,
            Phase::DmAdjudication,
            Phase::ResolveHelpers,
            Phase::DiceResolution,
            Phase::LaserFeelingsQuestion,
            Phase::DmOutcome,
            Phase::CharacterReaction,
            Phase::MemoryConsolidation,
        ] {
            assert!(GmCommand::EndSession.is_admissible(phase));
            assert!(GmCommand::AbortTurn.is_admissible(phase));
        }
    }

    #[test]
    fn rejection_lists_acceptable_commands() {
        let err = GmCommand::Accept
            .check_admissible(Phase::DmNarration)
            .expect_err("not admissible");
        assert!(err.acceptable.contains(&"narrate"));
        assert!(!err.acceptable.contains(&"accept"));
    }
}
