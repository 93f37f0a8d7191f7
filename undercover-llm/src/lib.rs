//! # undercover-llm
//!
//! The chat capability every agent talks through.
//!
//! ## Core Concepts
//! - **ChatCapability**: `chat(model, system, user, options)` returning text or
//!   parsed JSON, one implementation per vendor chosen at construction time
//! - **Retrying**: decorator that backs off on rate limits and fails fast on
//!   everything else
//! - **ProviderRegistry**: maps a configured provider name to a capability
//! - **MockChat**: scripted capability for tests and offline runs

pub mod provider;
pub mod retry;
pub mod registry;
pub mod mock;

pub use undercover_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    extract_json, is_rate_limited, AnthropicProvider, ChatCapability, ChatOptions, ChatReply,
    GeminiProvider, OpenAIProvider, ProviderConfig, ProviderType,
};
pub use retry::{retry_with_backoff, RetryPolicy, Retrying};
pub use registry::ProviderRegistry;
pub use mock::{ChatCall, MockChat};
