//! Game records and state
//!
//! Everything here is plain data, serialized with camelCase keys so a game
//! result can be written out as JSON and read by other tools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::prompts::Language;

/// 1-based player number, stable for the whole game
pub type PlayerId = u32;

// ============================================================================
// Roles and phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Civilian,
    Undercover,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Civilian => "civilian",
            Role::Undercover => "undercover",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Setup,
    Playing,
    Finished,
}

/// Sub-phase of a round, carried by round events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Statements,
    Voting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Civilians,
    Undercover,
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Winner::Civilians => "civilians",
            Winner::Undercover => "undercover",
            Winner::Draw => "draw",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Concepts
// ============================================================================

/// The two words of a game: `concept_a` for civilians, `concept_b` for undercover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptPair {
    pub concept_a: String,
    pub concept_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ConceptPair {
    pub fn new(concept_a: impl Into<String>, concept_b: impl Into<String>) -> Self {
        Self {
            concept_a: concept_a.into(),
            concept_b: concept_b.into(),
            index: None,
            category: None,
        }
    }

    /// The word handed to a player of `role`
    pub fn concept_for(&self, role: Role) -> &str {
        match role {
            Role::Civilian => &self.concept_a,
            Role::Undercover => &self.concept_b,
        }
    }

    /// The word a player of `role` did not receive
    pub fn other_concept(&self, role: Role) -> &str {
        match role {
            Role::Civilian => &self.concept_b,
            Role::Undercover => &self.concept_a,
        }
    }
}

// ============================================================================
// Scores
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub novelty: f64,
    pub relevance: f64,
    pub reasonableness: f64,
}

impl AxisScores {
    pub fn uniform(value: f64) -> Self {
        Self {
            novelty: value,
            relevance: value,
            reasonableness: value,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.novelty + self.relevance + self.reasonableness) / 3.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanations {
    pub novelty: String,
    pub relevance: String,
    pub reasonableness: String,
}

impl Explanations {
    pub fn uniform(text: &str) -> Self {
        Self {
            novelty: text.to_string(),
            relevance: text.to_string(),
            reasonableness: text.to_string(),
        }
    }
}

/// One judge's verdict on one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeEvaluation {
    pub judge_id: String,
    pub scores: AxisScores,
    pub explanations: Explanations,
    /// The judge's chat call failed; scores are placeholders
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// All evaluations of a statement plus their aggregate.
///
/// Degraded evaluations are kept for the record but do not contribute; with
/// no contributing judge both aggregates are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub evaluations: Vec<JudgeEvaluation>,
    pub averages: Option<AxisScores>,
    pub average: Option<f64>,
}

impl ScoreBundle {
    pub fn from_evaluations(evaluations: Vec<JudgeEvaluation>) -> Self {
        let contributing: Vec<&AxisScores> = evaluations
            .iter()
            .filter(|e| !e.error)
            .map(|e| &e.scores)
            .collect();

        let (averages, average) = if contributing.is_empty() {
            (None, None)
        } else {
            let n = contributing.len() as f64;
            let axes = AxisScores {
                novelty: contributing.iter().map(|s| s.novelty).sum::<f64>() / n,
                relevance: contributing.iter().map(|s| s.relevance).sum::<f64>() / n,
                reasonableness: contributing.iter().map(|s| s.reasonableness).sum::<f64>() / n,
            };
            let mean = contributing.iter().map(|s| s.mean()).sum::<f64>() / n;
            (Some(axes), Some(mean))
        };

        Self {
            evaluations,
            averages,
            average,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRecord {
    pub round: u32,
    pub player_id: PlayerId,
    pub statement: String,
    pub identity: String,
    pub strategy: String,
    pub scores: Option<ScoreBundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub round: u32,
    /// voter → target
    pub votes: BTreeMap<PlayerId, PlayerId>,
    /// target → votes received
    pub tally: BTreeMap<PlayerId, u32>,
    pub eliminated: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationCause {
    #[serde(rename = "low score")]
    LowScore,
    #[serde(rename = "voted out")]
    VotedOut,
}

impl fmt::Display for EliminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EliminationCause::LowScore => f.write_str("low score"),
            EliminationCause::VotedOut => f.write_str("voted out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminationRecord {
    pub player_id: PlayerId,
    pub round: u32,
    pub cause: EliminationCause,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u32>,
}

// ============================================================================
// State and snapshots
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub round: u32,
    pub phase: Phase,
    pub statements: Vec<StatementRecord>,
    pub votes: Vec<VoteRecord>,
    pub eliminations: Vec<EliminationRecord>,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub reason: Option<String>,
}

impl GameState {
    /// `Player <id>: "<text>"` lines, oldest first, every statement so far
    pub fn history_text(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("Player {}: \"{}\"", s.player_id, s.statement))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub provider: String,
    pub model: String,
    pub role: Role,
    pub concept: String,
    pub is_eliminated: bool,
    pub eliminated_in_round: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeSummary {
    pub id: String,
    pub provider: String,
    pub model: String,
}

/// Final snapshot of a finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub player_count: usize,
    pub undercover_count: usize,
    pub concept_pair: ConceptPair,
    pub language: Language,
    pub players: Vec<PlayerSummary>,
    pub judges: Vec<JudgeSummary>,
    pub statements: Vec<StatementRecord>,
    pub votes: Vec<VoteRecord>,
    pub eliminations: Vec<EliminationRecord>,
    pub winner: Winner,
    pub reason: String,
    pub total_rounds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(judge: &str, value: f64, error: bool) -> JudgeEvaluation {
        JudgeEvaluation {
            judge_id: judge.to_string(),
            scores: AxisScores::uniform(value),
            explanations: Explanations::default(),
            error,
        }
    }

    #[test]
    fn test_concept_for_role() {
        let pair = ConceptPair::new("tea", "coffee");
        assert_eq!(pair.concept_for(Role::Civilian), "tea");
        assert_eq!(pair.concept_for(Role::Undercover), "coffee");
        assert_eq!(pair.other_concept(Role::Undercover), "tea");
    }

    #[test]
    fn test_bundle_average_of_judge_means() {
        let mut first = evaluation("judge_1", 0.0, false);
        first.scores = AxisScores {
            novelty: 0.2,
            relevance: 0.4,
            reasonableness: 0.6,
        };
        let second = evaluation("judge_2", 0.8, false);

        let bundle = ScoreBundle::from_evaluations(vec![first, second]);
        let average = bundle.average.unwrap();
        assert!((average - 0.6).abs() < 1e-9);
        let averages = bundle.averages.unwrap();
        assert!((averages.novelty - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bundle_excludes_failed_judges() {
        let bundle = ScoreBundle::from_evaluations(vec![
            evaluation("judge_1", 0.5, true),
            evaluation("judge_2", 1.0, false),
        ]);
        assert_eq!(bundle.average, Some(1.0));
        assert_eq!(bundle.evaluations.len(), 2);

        let bundle = ScoreBundle::from_evaluations(vec![evaluation("judge_1", 0.5, true)]);
        assert_eq!(bundle.average, None);
        assert_eq!(bundle.averages, None);
    }

    #[test]
    fn test_history_text() {
        let mut state = GameState::default();
        assert_eq!(state.history_text(), "");

        for (id, text) in [(2, "It is hot"), (1, "People drink it")] {
            state.statements.push(StatementRecord {
                round: 1,
                player_id: id,
                statement: text.to_string(),
                identity: String::new(),
                strategy: String::new(),
                scores: None,
            });
        }
        assert_eq!(
            state.history_text(),
            "Player 2: \"It is hot\"\nPlayer 1: \"People drink it\""
        );
    }

    #[test]
    fn test_record_serialization() {
        let record = EliminationRecord {
            player_id: 3,
            round: 2,
            cause: EliminationCause::VotedOut,
            role: Role::Undercover,
            votes: Some(3),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["playerId"], 3);
        assert_eq!(value["cause"], "voted out");
        assert_eq!(value["role"], "undercover");

        let evaluation = evaluation("judge_1", 0.6, false);
        let value = serde_json::to_value(&evaluation).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["judgeId"], "judge_1");
    }
}
