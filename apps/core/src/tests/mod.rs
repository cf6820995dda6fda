//! Test Module
//!
//! Cross-component tests for the utterance logger.
//!
//! ## Test Categories
//! - `pipeline_tests`: tokenizer properties and the enrichment pipeline over mock services
//! - `database_tests`: SQLite document store behaviour on disk
//! - `integration_tests`: full turns through the real HTTP clients against mock servers
