//! Judge agent
//!
//! Scores a statement on novelty, relevance and reasonableness. A judge
//! never fails its caller: a broken chat call yields a degraded evaluation
//! flagged with `error`.

use serde_json::Value;
use std::sync::Arc;
use undercover_llm::{ChatCapability, ChatOptions, ChatReply};

use crate::config::AgentSpec;
use crate::prompts::{Language, Prompts};
use crate::types::{AxisScores, Explanations, JudgeEvaluation, JudgeSummary};

const JUDGE_TEMPERATURE: f32 = 0.3;

/// Score used for a missing or unusable axis
const DEFAULT_SCORE: f64 = 0.5;

const SCORE_LEVELS: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

pub struct Judge {
    id: String,
    spec: AgentSpec,
    prompts: Prompts,
    chat: Arc<dyn ChatCapability>,
}

impl Judge {
    pub fn new(
        id: impl Into<String>,
        spec: AgentSpec,
        language: Language,
        chat: Arc<dyn ChatCapability>,
    ) -> Self {
        Self {
            id: id.into(),
            spec,
            prompts: Prompts::for_language(language),
            chat,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn summary(&self) -> JudgeSummary {
        JudgeSummary {
            id: self.id.clone(),
            provider: self.spec.provider.to_string(),
            model: self.spec.model.clone(),
        }
    }

    pub async fn evaluate_statement(
        &self,
        player_concept: &str,
        other_concept: &str,
        statement: &str,
        history: &str,
    ) -> JudgeEvaluation {
        let user = self
            .prompts
            .judge_user(player_concept, other_concept, statement, history);
        let options = ChatOptions::new().with_temperature(JUDGE_TEMPERATURE).json();

        let reply = self
            .chat
            .chat(&self.spec.model, self.prompts.judge_system(), &user, &options)
            .await
            .and_then(ChatReply::into_json);

        match reply {
            Ok(value) => JudgeEvaluation {
                judge_id: self.id.clone(),
                scores: AxisScores {
                    novelty: parse_axis(value.get("novelty")),
                    relevance: parse_axis(value.get("relevance")),
                    reasonableness: parse_axis(value.get("reasonableness")),
                },
                explanations: Explanations {
                    novelty: explanation(value.get("novelty")),
                    relevance: explanation(value.get("relevance")),
                    reasonableness: explanation(value.get("reasonableness")),
                },
                error: false,
            },
            Err(err) => {
                log::warn!("[{}] evaluation failed, using neutral scores: {}", self.id, err);
                JudgeEvaluation {
                    judge_id: self.id.clone(),
                    scores: AxisScores::uniform(DEFAULT_SCORE),
                    explanations: Explanations::uniform("Error in evaluation"),
                    error: true,
                }
            }
        }
    }
}

/// One axis: a bare number or `{"score": ..}`, quantized; anything else is 0.5
pub fn parse_axis(axis: Option<&Value>) -> f64 {
    let raw = match axis {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Object(obj)) => match obj.get("score") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => leading_float(s),
            _ => None,
        },
        _ => None,
    };

    match raw {
        Some(score) if (0.0..=1.0).contains(&score) => quantize(score),
        Some(score) => {
            log::warn!("invalid score {}, using {}", score, DEFAULT_SCORE);
            DEFAULT_SCORE
        }
        None => DEFAULT_SCORE,
    }
}

/// Snap to the nearest of 0, 0.2, .., 1.0; exact ties go to the lower level
pub fn quantize(score: f64) -> f64 {
    let mut closest = SCORE_LEVELS[0];
    let mut min_diff = (score - closest).abs();
    for level in SCORE_LEVELS {
        let diff = (score - level).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = level;
        }
    }
    closest
}

fn explanation(axis: Option<&Value>) -> String {
    axis.and_then(|a| a.get("explanation"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Longest numeric prefix, e.g. "0.8 (strong)" → 0.8
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use undercover_error::Error;
    use undercover_llm::{MockChat, ProviderType};

    fn judge(mock: Arc<MockChat>) -> Judge {
        Judge::new(
            "judge_1",
            AgentSpec::new(ProviderType::Mock, "Claude-3-Haiku"),
            Language::En,
            mock,
        )
    }

    #[test]
    fn test_quantize_levels() {
        assert_eq!(quantize(0.0), 0.0);
        assert_eq!(quantize(1.0), 1.0);
        assert_eq!(quantize(0.55), 0.6);
        assert_eq!(quantize(0.3), 0.2);
        assert_eq!(quantize(0.21), 0.2);
        assert_eq!(quantize(0.95), 1.0);
        assert_eq!(quantize(0.79), 0.8);
    }

    #[test]
    fn test_quantize_tie_goes_to_lower_level() {
        // 0.5 and 0.1 are equidistant from their neighbouring levels in f64
        assert_eq!(quantize(0.5), 0.4);
        assert_eq!(quantize(0.1), 0.0);
    }

    #[test]
    fn test_quantize_always_lands_on_a_level() {
        for i in 0..=1000 {
            let q = quantize(i as f64 / 1000.0);
            assert!(SCORE_LEVELS.contains(&q));
        }
    }

    #[test]
    fn test_parse_axis() {
        assert_eq!(parse_axis(Some(&json!(0.8))), 0.8);
        assert_eq!(parse_axis(Some(&json!({"score": 0.62}))), 0.6);
        assert_eq!(parse_axis(Some(&json!({"score": "0.4"}))), 0.4);
        assert_eq!(parse_axis(Some(&json!({"score": "1 (obvious)"}))), 1.0);
        assert_eq!(parse_axis(None), 0.5);
        assert_eq!(parse_axis(Some(&json!({"score": "high"}))), 0.5);
        assert_eq!(parse_axis(Some(&json!({"score": 1.7}))), 0.5);
        assert_eq!(parse_axis(Some(&json!(-0.2))), 0.5);
        assert_eq!(parse_axis(Some(&json!("0.8"))), 0.5);
    }

    #[tokio::test]
    async fn test_evaluation() {
        let mock = Arc::new(MockChat::new().reply_json(json!({
            "novelty": {"score": 1.0, "explanation": "first statement"},
            "relevance": {"score": 0.25, "explanation": "very broad"},
            "reasonableness": 0.9
        })));
        let j = judge(mock.clone());

        let eval = j
            .evaluate_statement("tea", "coffee", "A hot drink", "")
            .await;
        assert!(!eval.error);
        assert_eq!(eval.judge_id, "judge_1");
        assert_eq!(eval.scores.novelty, 1.0);
        assert_eq!(eval.scores.relevance, 0.2);
        assert_eq!(eval.explanations.relevance, "very broad");
        assert_eq!(eval.explanations.reasonableness, "");

        let call = &mock.calls()[0];
        assert_eq!(call.options.temperature, Some(0.3));
        assert!(call.user.contains("\"coffee\""));
    }

    #[tokio::test]
    async fn test_failed_call_degrades() {
        let mock = Arc::new(MockChat::new().fail(Error::network_failed("down")));
        let eval = judge(mock)
            .evaluate_statement("tea", "coffee", "A hot drink", "")
            .await;
        assert!(eval.error);
        assert_eq!(eval.scores, AxisScores::uniform(0.5));
        assert_eq!(eval.explanations.novelty, "Error in evaluation");
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades() {
        let mock = Arc::new(MockChat::new().reply("I think it is a fine statement"));
        let eval = judge(mock)
            .evaluate_statement("tea", "coffee", "A hot drink", "")
            .await;
        assert!(eval.error);
    }
}
