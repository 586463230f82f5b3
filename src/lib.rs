//! LegalTrans - Legal Document Translation Comparison
//!
//! A Rust implementation of a workflow that translates English legal
//! documents to Ukrainian through Google Translate, a local MarianMT model
//! and an OpenAI chat model, then writes a side-by-side DOCX report.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod progress;
pub mod report;
pub mod setup;
pub mod source;
pub mod translate;
pub mod workflow;
