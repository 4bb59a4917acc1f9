//! NLP boundary for clinical insight discovery.
//!
//! This crate provides the annotation container returned by clinical NLP services,
//! parsers for ACD and QuickUMLS responses, and the `NlpService` trait with two
//! in-process implementations.

pub mod annotations;
pub mod quickumls;
pub mod service;

pub use annotations::*;
pub use service::*;
