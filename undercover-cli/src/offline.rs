//! Offline stand-in for a real model, selected with the `mock` provider.
//!
//! Answers every prompt with well-formed JSON so a whole game can be run
//! without API keys.

use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use undercover_llm::{ChatCall, ChatCapability, MockChat};

const REMARKS: &[&str] = &[
    "You usually come across it in everyday life.",
    "Most people have an opinion about it.",
    "It comes in more than one size.",
    "Some people like it a lot more than others.",
    "You can find it in many countries.",
];

pub fn offline_chat() -> Arc<dyn ChatCapability> {
    let counter = AtomicU64::new(0);
    Arc::new(
        MockChat::new()
            .with_name("mock")
            .respond_with(move |call| {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                Ok(answer(call, n).to_string())
            }),
    )
}

fn answer(call: &ChatCall, n: u64) -> serde_json::Value {
    if call.system.contains("\"novelty\"") {
        let score = [0.6, 0.8, 1.0][(n % 3) as usize];
        let axis = json!({"score": score, "explanation": "offline judge"});
        return json!({"novelty": axis, "relevance": axis, "reasonableness": axis});
    }

    let me = own_id(&call.user);
    if call.system.contains("\"vote\"") {
        let targets: Vec<u64> = alive_ids(&call.user)
            .into_iter()
            .filter(|&id| Some(id) != me)
            .collect();
        let vote = match targets.len() {
            0 => 0,
            len => targets[(n as usize) % len],
        };
        return json!({
            "identity": "Nothing stands out yet.",
            "strategy": "Vote for the vaguest speaker.",
            "vote": vote,
        });
    }

    json!({
        "identity": "I cannot tell which side I am on yet.",
        "strategy": "Stay broad and watch the others.",
        "statement": REMARKS[(n as usize) % REMARKS.len()],
    })
}

fn own_id(user: &str) -> Option<u64> {
    let tail = user.split("player_").nth(1)?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// The alive list is the only line made purely of comma-separated ids
fn alive_ids(user: &str) -> Vec<u64> {
    user.lines()
        .rev()
        .find_map(|line| {
            let ids: Option<Vec<u64>> = line
                .split(',')
                .map(|part| part.trim().parse().ok())
                .collect();
            ids.filter(|ids| !ids.is_empty())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use undercover_llm::ChatOptions;

    fn call(system: &str, user: &str) -> ChatCall {
        ChatCall {
            model: "offline".into(),
            system: system.into(),
            user: user.into(),
            options: ChatOptions::new(),
        }
    }

    #[test]
    fn test_vote_targets_someone_else() {
        let user = "You are player_2, your word is \"tea\".\n# Players\n1, 2, 3\nVote now.\n";
        for n in 0..6 {
            let value = answer(&call("reply with \"vote\"", user), n);
            let vote = value["vote"].as_u64().unwrap();
            assert!(vote == 1 || vote == 3);
        }
    }

    #[test]
    fn test_judge_reply_has_every_axis() {
        let value = answer(&call("score \"novelty\"", "statement"), 4);
        for axis in ["novelty", "relevance", "reasonableness"] {
            assert!(value[axis]["score"].as_f64().is_some());
        }
    }

    #[tokio::test]
    async fn test_statement_reply_is_json() {
        let chat = offline_chat();
        let reply = chat
            .chat("offline", "describe", "You are player_1", &ChatOptions::new().json())
            .await
            .unwrap()
            .into_json()
            .unwrap();
        assert!(reply["statement"].as_str().is_some());
    }
}
