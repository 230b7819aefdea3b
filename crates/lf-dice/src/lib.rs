//! Dice resolution engine (spec.md §4.6).
//!
//! Assembles a character's dice pool, rolls it against an injected random
//! source, classifies successes and LASER FEELINGS, and parses the GM's
//! override notation (spec.md §6.2) for `dm_adjudication`. Per spec.md §9,
//! personality traits never reach this crate -- only mechanical inputs
//! (`number`, `task_type`, `is_prepared`, `is_expert`, helper counts) do.

pub mod error;
pub mod notation;
pub mod roll;

pub use error::DiceError;
pub use notation::{OverrideSpec, parse_override};
pub use roll::{pool_size, reclassify, roll, roll_helper_preroll};
