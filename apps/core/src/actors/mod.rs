//! # Actors
//!
//! External collaborators of the pipeline, each behind a trait from `traits`,
//! and the supervisor that drives one message at a time through them.

pub mod http;
pub mod luis;
pub mod messages;
pub mod storage;
pub mod supervisor;
pub mod text_analytics;
pub mod traits;
