//! Single-consumer message pipeline.
//!
//! `MessageProcessor::process` handles one update:
//! persist inbound → command or question → reply → persist outbound.
//! `MessageProcessor::run` drives it over the gateway's update stream.

pub mod answer;
pub mod consumer;
pub mod error;
pub mod processor;

pub use error::ProcessError;
pub use processor::{MessageProcessor, Outcome, PipelineSettings, RESTART_COMMAND};
