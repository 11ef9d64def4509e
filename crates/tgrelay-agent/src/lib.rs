//! Message pipeline: the chat gateway seam and the single-consumer
//! processor that turns inbound chat messages into completion answers.

pub mod gateway;
pub mod pipeline;

pub use gateway::{ChatGateway, GatewayError};
pub use pipeline::{MessageProcessor, Outcome, PipelineSettings, ProcessError};
