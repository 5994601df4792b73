//! Core domain types and logic.

pub mod collection;
pub mod config_validation;
pub mod error;
pub mod filter_preset;
pub mod preset_store;
pub mod record;
pub mod record_filter;
pub mod record_store;
pub mod statistics;
pub mod vocabulary;
