//! Three-channel message router (spec.md §4.2, §4.3).
//!
//! Enforces IC/OOC/P2C visibility at the data-access boundary rather than by
//! caller convention: the only public surface is [`Router`], whose
//! `fetch_for_character`/`fetch_for_player` methods each talk to a single
//! [`store::ChannelLog`] in the one way their layer is permitted to.

pub mod error;
pub mod router;
pub mod store;
pub mod summary;

pub use error::RouterError;
pub use router::Router;
pub use store::{ChannelLog, InMemoryChannelLog, RETENTION};
pub use summary::derive_ic_summary;
