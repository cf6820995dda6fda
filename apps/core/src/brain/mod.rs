//! # Brain Module
//!
//! Message-enrichment pipeline for the utterance logger.
//! Turns one raw utterance into a storable record.
//!
//! ## Components
//! - `tokenizer`: word segmentation with stopword and non-alphabetic filtering
//! - `intent`: classifier prediction parsing (top intent, score, sentiment label)
//! - `sentiment`: sentiment labels, confidence scores, batch response parsing
//! - `record`: the persisted record and its reply rendering
//! - `analyzer`: main orchestrator and partial-failure policy

pub mod analyzer;
pub mod intent;
pub mod record;
pub mod sentiment;
pub mod tokenizer;

// Re-export main types for convenience
#[allow(unused_imports)]
pub use analyzer::{EnrichmentPipeline, FailurePolicy};
#[allow(unused_imports)]
pub use intent::IntentResult;
#[allow(unused_imports)]
pub use record::EnrichmentRecord;
#[allow(unused_imports)]
pub use sentiment::{ConfidenceScores, SentimentLabel, SentimentResult};
#[allow(unused_imports)]
pub use tokenizer::{Language, TokenizedUtterance, Tokenizer};
