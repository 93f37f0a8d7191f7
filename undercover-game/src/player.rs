//! Player agent
//!
//! Wraps a chat capability with the speaking and voting prompts, and turns
//! free-form model output into a statement or a vote.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use undercover_error::{Error, Result};
use undercover_llm::{ChatCapability, ChatOptions, ChatReply};

use crate::config::AgentSpec;
use crate::prompts::{Language, Prompts};
use crate::types::{PlayerId, PlayerSummary, Role};

const PLAYER_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct StatementDecision {
    pub statement: String,
    pub identity: String,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteDecision {
    pub vote: PlayerId,
    pub identity: String,
    pub strategy: String,
    /// The model's answer was unusable and `vote` was drawn at random
    pub fallback: bool,
}

pub struct Player {
    id: PlayerId,
    spec: AgentSpec,
    role: Role,
    concept: String,
    eliminated_in: Option<u32>,
    /// Last self-reported identity analysis, fed back into the next prompt
    memory: String,
    prompts: Prompts,
    chat: Arc<dyn ChatCapability>,
    rng: StdRng,
}

impl Player {
    pub fn new(
        id: PlayerId,
        spec: AgentSpec,
        role: Role,
        concept: impl Into<String>,
        language: Language,
        chat: Arc<dyn ChatCapability>,
        rng: StdRng,
    ) -> Self {
        let prompts = Prompts::for_language(language);
        Self {
            id,
            spec,
            role,
            concept: concept.into(),
            eliminated_in: None,
            memory: prompts.first_round_memory().to_string(),
            prompts,
            chat,
            rng,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn memory(&self) -> &str {
        &self.memory
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated_in.is_some()
    }

    pub fn eliminated_in_round(&self) -> Option<u32> {
        self.eliminated_in
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            provider: self.spec.provider.to_string(),
            model: self.spec.model.clone(),
            role: self.role,
            concept: self.concept.clone(),
            is_eliminated: self.is_eliminated(),
            eliminated_in_round: self.eliminated_in,
        }
    }

    /// Mark the player out. Must be called at most once.
    pub fn eliminate(&mut self, round: u32) {
        debug_assert!(
            self.eliminated_in.is_none(),
            "player {} eliminated twice",
            self.id
        );
        self.eliminated_in = Some(round);
    }

    /// Ask the model for this turn's description.
    ///
    /// Chat failures and replies without a statement propagate; the caller
    /// decides what a failed turn means.
    pub async fn generate_statement(
        &mut self,
        history: &str,
        alive: &[PlayerId],
    ) -> Result<StatementDecision> {
        log::debug!(
            "[player {}] generating statement ({} players alive)",
            self.id,
            alive.len()
        );

        let user = self
            .prompts
            .speak_user(self.id, &self.concept, history, &self.memory);
        let options = ChatOptions::new().with_temperature(PLAYER_TEMPERATURE).json();

        let value = self
            .chat
            .chat(&self.spec.model, self.prompts.speak_system(), &user, &options)
            .await
            .and_then(ChatReply::into_json)
            .map_err(|e| {
                e.with_operation("player::generate_statement")
                    .with_context("player", self.id.to_string())
            })?;

        let statement = text_field(&value, "statement")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                Error::malformed_response("response missing statement field")
                    .with_operation("player::generate_statement")
                    .with_context("player", self.id.to_string())
            })?;

        let identity = self.remember(&value);
        Ok(StatementDecision {
            statement,
            identity,
            strategy: text_field(&value, "strategy").unwrap_or_default(),
        })
    }

    /// Ask the model whom to vote for.
    ///
    /// Never fails on model behaviour: an invalid target or a failed chat
    /// call both become a uniformly random vote for another alive player.
    /// Fails only when there is nobody else to vote for.
    pub async fn generate_vote(&mut self, history: &str, alive: &[PlayerId]) -> Result<VoteDecision> {
        let targets: Vec<PlayerId> = alive.iter().copied().filter(|&id| id != self.id).collect();
        if targets.is_empty() {
            return Err(Error::no_valid_target(self.id.to_string())
                .with_operation("player::generate_vote"));
        }

        let user = self
            .prompts
            .vote_user(self.id, &self.concept, history, &self.memory, alive);
        let options = ChatOptions::new().with_temperature(PLAYER_TEMPERATURE).json();

        let reply = self
            .chat
            .chat(&self.spec.model, self.prompts.vote_system(), &user, &options)
            .await
            .and_then(ChatReply::into_json);

        let value = match reply {
            Ok(value) => value,
            Err(err) => {
                log::warn!("[player {}] vote failed, voting at random: {}", self.id, err);
                return Ok(VoteDecision {
                    vote: self.random_target(&targets),
                    identity: "Error generating vote".to_string(),
                    strategy: "Random fallback vote".to_string(),
                    fallback: true,
                });
            }
        };

        let strategy = text_field(&value, "strategy").unwrap_or_default();
        let identity = self.remember(&value);

        match parse_vote(&value) {
            Some(target) if targets.contains(&target) => Ok(VoteDecision {
                vote: target,
                identity,
                strategy,
                fallback: false,
            }),
            _ => {
                log::warn!(
                    "[player {}] invalid vote {}, choosing random target",
                    self.id,
                    value.get("vote").unwrap_or(&Value::Null)
                );
                Ok(VoteDecision {
                    vote: self.random_target(&targets),
                    identity,
                    strategy,
                    fallback: true,
                })
            }
        }
    }

    /// Replace memory with the reported identity analysis, if any
    fn remember(&mut self, value: &Value) -> String {
        match text_field(value, "identity").filter(|s| !s.trim().is_empty()) {
            Some(identity) => {
                self.memory = identity.clone();
                identity
            }
            None => String::new(),
        }
    }

    fn random_target(&mut self, targets: &[PlayerId]) -> PlayerId {
        targets[self.rng.random_range(0..targets.len())]
    }
}

/// Read a field as text; non-string values are rendered as JSON
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Integer vote from a number or a string starting with an integer
/// ("3", "3 - suspicious"). Negative or non-numeric leads are rejected.
pub fn parse_vote(value: &Value) -> Option<PlayerId> {
    match value.get("vote")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| PlayerId::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim_start();
            let unsigned = s.strip_prefix('+').unwrap_or(s);
            let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                None
            } else {
                digits.parse().ok()
            }
        }
        _ => None,
    }
}
