//! # undercover-game
//!
//! "Who is the Undercover" played entirely by LLM agents.
//!
//! Every player gets a word; most share one word (civilians), a few get a
//! related one (undercover). Players describe their word without naming it,
//! judges score each description, and periodic votes eliminate suspects.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     GameEngine                       │
//! │  setup → rounds (statements, votes) → win check      │
//! └───────┬───────────────────┬──────────────────┬───────┘
//!         │                   │                  │
//!    ┌────▼─────┐        ┌────▼─────┐      ┌─────▼─────┐
//!    │  Player  │        │  Judge   │      │ EventSink │
//!    └────┬─────┘        └────┬─────┘      └───────────┘
//!         └─────────┬─────────┘
//!            ┌──────▼─────────┐
//!            │ ChatCapability │  (undercover-llm)
//!            └────────────────┘
//! ```
//!
//! The engine is sequential: one agent call at a time, state touched only
//! by the control loop.

pub mod types;
pub mod prompts;
pub mod concepts;
pub mod config;
pub mod event;
pub mod player;
pub mod judge;
pub mod rules;
pub mod engine;

pub use undercover_error::{Error, ErrorKind, Result};
pub use types::*;
pub use prompts::{Language, Prompts};
pub use concepts::{ConceptLibrary, ConceptSource};
pub use config::{AgentSpec, GameConfig, RetryConfig};
pub use event::{ChannelSink, EventSink, GameEvent, NoopSink};
pub use player::{Player, StatementDecision, VoteDecision};
pub use judge::{quantize, Judge};
pub use engine::GameEngine;
