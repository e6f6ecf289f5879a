//! Core library: catalog normalization, rule/semantic/arbitration matching, reporting.

pub mod accuracy;
pub mod arbitration;
pub mod catalog;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod semantic;
