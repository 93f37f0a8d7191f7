//! Lifecycle event stream
//!
//! The engine emits one [`GameEvent`] per occurrence into an [`EventSink`].
//! Delivery is synchronous and fire-and-forget: nothing is buffered,
//! acknowledged, or replayed.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::types::{
    ConceptPair, EliminationRecord, GameResult, JudgeSummary, PlayerId, PlayerSummary,
    RoundPhase, ScoreBundle, StatementRecord, Winner,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    /// The only event that reveals role assignments
    GameSetup {
        players: Vec<PlayerSummary>,
        judges: Vec<JudgeSummary>,
        concept_pair: ConceptPair,
    },
    GameStart {
        player_count: usize,
        undercover_count: usize,
        max_rounds: u32,
    },
    RoundStart {
        round: u32,
        phase: RoundPhase,
    },
    PlayerTurn {
        round: u32,
        player_id: PlayerId,
        phase: RoundPhase,
    },
    StatementGenerated {
        statement: StatementRecord,
    },
    StatementEvaluated {
        round: u32,
        player_id: PlayerId,
        scores: ScoreBundle,
    },
    PlayerEliminated {
        elimination: EliminationRecord,
    },
    VoteGenerated {
        round: u32,
        voter_id: PlayerId,
        voted_for: PlayerId,
    },
    RoundEnd {
        round: u32,
        phase: RoundPhase,
    },
    GameEnd {
        winner: Winner,
        reason: String,
        final_state: Box<GameResult>,
    },
    /// A player's turn failed; the round carries on without it
    Error {
        phase: RoundPhase,
        player_id: PlayerId,
        message: String,
    },
}

impl GameEvent {
    /// Wire name, as found in the serialized `type` field
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameSetup { .. } => "gameSetup",
            GameEvent::GameStart { .. } => "gameStart",
            GameEvent::RoundStart { .. } => "roundStart",
            GameEvent::PlayerTurn { .. } => "playerTurn",
            GameEvent::StatementGenerated { .. } => "statementGenerated",
            GameEvent::StatementEvaluated { .. } => "statementEvaluated",
            GameEvent::PlayerEliminated { .. } => "playerEliminated",
            GameEvent::VoteGenerated { .. } => "voteGenerated",
            GameEvent::RoundEnd { .. } => "roundEnd",
            GameEvent::GameEnd { .. } => "gameEnd",
            GameEvent::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Consumer of engine events
pub trait EventSink: Send {
    fn emit(&mut self, event: &GameEvent);
}

/// Default sink: drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&mut self, _event: &GameEvent) {}
}

impl<F> EventSink for F
where
    F: FnMut(&GameEvent) + Send,
{
    fn emit(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<GameEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<GameEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: UnboundedSender<GameEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: &GameEvent) {
        if self.tx.send(event.clone()).is_err() {
            log::debug!("[event] receiver dropped, discarding {}", event.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serialized_type() {
        let events = vec![
            GameEvent::RoundStart {
                round: 1,
                phase: RoundPhase::Statements,
            },
            GameEvent::VoteGenerated {
                round: 1,
                voter_id: 2,
                voted_for: 4,
            },
            GameEvent::Error {
                phase: RoundPhase::Statements,
                player_id: 3,
                message: "MalformedResponse".into(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }

    #[test]
    fn test_payload_keys_are_camel_case() {
        let event = GameEvent::VoteGenerated {
            round: 2,
            voter_id: 1,
            voted_for: 5,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["voterId"], 1);
        assert_eq!(value["votedFor"], 5);

        let back: GameEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &GameEvent| seen.push(event.name());
            sink.emit(&GameEvent::RoundEnd {
                round: 1,
                phase: RoundPhase::Voting,
            });
        }
        assert_eq!(seen, vec!["roundEnd"]);
    }

    #[test]
    fn test_channel_sink() {
        let (mut sink, mut rx) = ChannelSink::new();
        sink.emit(&GameEvent::RoundStart {
            round: 3,
            phase: RoundPhase::Voting,
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name(), "roundStart");

        drop(rx);
        sink.emit(&GameEvent::RoundEnd {
            round: 3,
            phase: RoundPhase::Voting,
        });
    }
}
