//! Anthropic Messages API adapter for task generation.

pub mod client;
pub mod errors;
pub mod retry;

pub use client::AnthropicTextGenerator;
pub use errors::AnthropicError;
pub use retry::RetryPolicy;
