//! Prompt templates for players and judges, in English and Chinese

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use undercover_error::{Error, Result};

use crate::types::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "cn" | "chinese" => Ok(Language::Zh),
            other => Err(Error::invalid_argument(format!("unsupported language '{}'", other))),
        }
    }
}

/// Prompt builder for one language
#[derive(Debug, Clone, Copy)]
pub struct Prompts {
    language: Language,
}

impl Prompts {
    pub fn for_language(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Memory a player starts with before any analysis exists
    pub fn first_round_memory(&self) -> &'static str {
        match self.language {
            Language::En => "This is the first round, no previous analysis.",
            Language::Zh => "这是第一轮，还没有之前的分析。",
        }
    }

    fn history_or_marker<'a>(&self, history: &'a str) -> &'a str {
        if history.trim().is_empty() {
            match self.language {
                Language::En => "(no statements yet)",
                Language::Zh => "（暂无发言）",
            }
        } else {
            history
        }
    }

    // ========================================================================
    // Player: statement
    // ========================================================================

    pub fn speak_system(&self) -> &'static str {
        match self.language {
            Language::En => EN_SPEAK_SYSTEM,
            Language::Zh => ZH_SPEAK_SYSTEM,
        }
    }

    pub fn speak_user(
        &self,
        player_id: PlayerId,
        concept: &str,
        history: &str,
        last_analysis: &str,
    ) -> String {
        let history = self.history_or_marker(history);
        match self.language {
            Language::En => format!(
                "Here is the state of the current game. Analyze it and complete your task.\n\
                 # About you\n\
                 You are player_{player_id}, your word is \"{concept}\".\n\
                 # Statements so far\n\
                 {history}\n\
                 # Your identity analysis from the previous round\n\
                 {last_analysis}\n"
            ),
            Language::Zh => format!(
                "以下是本局游戏的当前信息，请分析后完成你的任务。\n\
                 # 你的信息\n\
                 你是player_{player_id}，你的词语是\"{concept}\"。\n\
                 # 目前的发言记录\n\
                 {history}\n\
                 # 你上一轮的身份分析\n\
                 {last_analysis}\n"
            ),
        }
    }

    // ========================================================================
    // Player: vote
    // ========================================================================

    pub fn vote_system(&self) -> &'static str {
        match self.language {
            Language::En => EN_VOTE_SYSTEM,
            Language::Zh => ZH_VOTE_SYSTEM,
        }
    }

    pub fn vote_user(
        &self,
        player_id: PlayerId,
        concept: &str,
        history: &str,
        last_analysis: &str,
        alive: &[PlayerId],
    ) -> String {
        let history = self.history_or_marker(history);
        let alive = alive
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.language {
            Language::En => format!(
                "Here is the state of the current game. Analyze it and complete your task.\n\
                 # About you\n\
                 You are player_{player_id}, your word is \"{concept}\".\n\
                 # Statements so far\n\
                 {history}\n\
                 # Your identity analysis from the previous round\n\
                 {last_analysis}\n\
                 # Players still in the game\n\
                 {alive}\n\
                 Vote for exactly one of these numbers, and not for yourself.\n"
            ),
            Language::Zh => format!(
                "以下是本局游戏的当前信息，请分析后完成你的任务。\n\
                 # 你的信息\n\
                 你是player_{player_id}，你的词语是\"{concept}\"。\n\
                 # 目前的发言记录\n\
                 {history}\n\
                 # 你上一轮的身份分析\n\
                 {last_analysis}\n\
                 # 仍在场上的玩家\n\
                 {alive}\n\
                 只能从这些编号中选择一个投票，不能投给自己。\n"
            ),
        }
    }

    // ========================================================================
    // Judge
    // ========================================================================

    pub fn judge_system(&self) -> &'static str {
        match self.language {
            Language::En => EN_JUDGE_SYSTEM,
            Language::Zh => ZH_JUDGE_SYSTEM,
        }
    }

    pub fn judge_user(
        &self,
        concept: &str,
        other_concept: &str,
        statement: &str,
        history: &str,
    ) -> String {
        let history = self.history_or_marker(history);
        match self.language {
            Language::En => format!(
                "Evaluate the following statement.\n\
                 # Player\n\
                 Player's word: \"{concept}\"\n\
                 The other word in this game: \"{other_concept}\"\n\
                 Statement: \"{statement}\"\n\n\
                 # Statements so far\n\
                 {history}\n"
            ),
            Language::Zh => format!(
                "请评价以下发言。\n\
                 # 玩家信息\n\
                 玩家的词语：\"{concept}\"\n\
                 本局的另一个词语：\"{other_concept}\"\n\
                 发言：\"{statement}\"\n\n\
                 # 目前的发言记录\n\
                 {history}\n"
            ),
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

const EN_SPEAK_SYSTEM: &str = concat!(
    "You are an AI player in the game \"Who is the Undercover\". Work out from the information you receive whether you are a civilian or undercover, then decide what to say.\n\n",
    "# Rules\n",
    "1. Every player gets a word. Most players share the same word (civilians); one or two get a related but different word (undercover).\n",
    "2. Players take turns describing their word in one sentence without saying it.\n",
    "3. After descriptions, everyone votes for the player they suspect; the most-voted player is eliminated.\n",
    "4. Civilians win once every undercover player is out. Undercover players win once they equal or outnumber the civilians.\n\n",
    "# Speaking\n",
    "- One short descriptive sentence, never the word itself.\n",
    "- Do not repeat anything another player already said.\n",
    "- The description must be true of your word. Tune how specific it is: \"a round object\" is vague, \"kicked across a green field by two teams\" gives a soccer ball away.\n\n",
    "# Strategy\n",
    "- Early on, stay broad until you know which side you are on.\n",
    "- As a civilian, look for descriptions that do not fit the majority and narrow the word down.\n",
    "- As undercover, infer the civilians' word and say things that fit both words.\n\n",
    "# Output\n",
    "Reply with JSON only:\n",
    "{\n",
    "  \"identity\": \"your analysis of your own and others' roles\",\n",
    "  \"strategy\": \"your reasoning\",\n",
    "  \"statement\": \"the sentence you say out loud\"\n",
    "}\n",
);

const EN_VOTE_SYSTEM: &str = concat!(
    "You are an AI player in the game \"Who is the Undercover\". Work out from the information you receive whether you are a civilian or undercover, then vote to eliminate one player.\n\n",
    "# Rules\n",
    "1. Every player gets a word. Most players share the same word (civilians); one or two get a related but different word (undercover).\n",
    "2. Players take turns describing their word in one sentence without saying it.\n",
    "3. After descriptions, everyone votes for the player they suspect; the most-voted player is eliminated.\n",
    "4. Civilians win once every undercover player is out. Undercover players win once they equal or outnumber the civilians.\n\n",
    "# Output\n",
    "Reply with JSON only:\n",
    "{\n",
    "  \"identity\": \"your analysis of your role\",\n",
    "  \"strategy\": \"your reasoning\",\n",
    "  \"vote\": \"the number of the player you vote for, nothing else\"\n",
    "}\n",
);

const EN_JUDGE_SYSTEM: &str = concat!(
    "You referee the game \"Who is the Undercover\". Score each statement on three axes and answer in JSON.\n\n",
    "# Axes (each one of 0, 0.2, 0.4, 0.6, 0.8, 1)\n",
    "1. novelty: 0 repeats an earlier statement outright, 1 brings a completely new angle.\n",
    "2. relevance: 0 unrelated to the word, 0.2 fits almost anything, 1 practically names the word.\n",
    "3. reasonableness: 0 no sensible link to the word, 1 fully matches the word's characteristics.\n\n",
    "# Output\n",
    "{\n",
    "  \"novelty\": {\"score\": 0.0, \"explanation\": \"...\"},\n",
    "  \"relevance\": {\"score\": 0.0, \"explanation\": \"...\"},\n",
    "  \"reasonableness\": {\"score\": 0.0, \"explanation\": \"...\"}\n",
    "}\n\n",
    "# Example\n",
    "Word \"soccer ball\", statement \"A spherical object\", first to speak:\n",
    "{\"novelty\": {\"score\": 1.0, \"explanation\": \"first statement\"}, ",
    "\"relevance\": {\"score\": 0.2, \"explanation\": \"fits any ball\"}, ",
    "\"reasonableness\": {\"score\": 1.0, \"explanation\": \"a soccer ball is spherical\"}}\n",
);

const ZH_SPEAK_SYSTEM: &str = concat!(
    "你是\"谁是卧底\"游戏中的AI玩家。请根据收到的信息判断自己是平民还是卧底，并决定发言内容。\n\n",
    "# 规则\n",
    "1. 每位玩家拿到一个词。多数玩家的词相同（平民），一到两名玩家拿到相关但不同的词（卧底）。\n",
    "2. 玩家轮流用一句话描述自己的词，不能说出这个词。\n",
    "3. 描述结束后全体投票，得票最多的玩家出局。\n",
    "4. 卧底全部出局则平民获胜；卧底人数等于或多于平民则卧底获胜。\n\n",
    "# 发言要求\n",
    "- 一句简短的描述，不能直接说出词语。\n",
    "- 不能重复其他玩家说过的内容。\n",
    "- 描述必须符合你的词，并根据需要调整具体程度。\n\n",
    "# 策略\n",
    "- 身份未明时先从宽泛的特征说起。\n",
    "- 作为平民，找出与多数人不一致的描述。\n",
    "- 作为卧底，推测平民的词，说出两个词都适用的描述。\n\n",
    "# 输出\n",
    "只回复JSON：\n",
    "{\n",
    "  \"identity\": \"对自己和其他玩家身份的分析\",\n",
    "  \"strategy\": \"你的思考过程\",\n",
    "  \"statement\": \"你的发言\"\n",
    "}\n",
);

const ZH_VOTE_SYSTEM: &str = concat!(
    "你是\"谁是卧底\"游戏中的AI玩家。请根据收到的信息判断自己的身份，并投票淘汰一名玩家。\n\n",
    "# 规则\n",
    "1. 每位玩家拿到一个词。多数玩家的词相同（平民），一到两名玩家拿到相关但不同的词（卧底）。\n",
    "2. 玩家轮流用一句话描述自己的词，不能说出这个词。\n",
    "3. 描述结束后全体投票，得票最多的玩家出局。\n",
    "4. 卧底全部出局则平民获胜；卧底人数等于或多于平民则卧底获胜。\n\n",
    "# 输出\n",
    "只回复JSON：\n",
    "{\n",
    "  \"identity\": \"对自己身份的分析\",\n",
    "  \"strategy\": \"你的思考过程\",\n",
    "  \"vote\": \"你投票的玩家编号，只写数字\"\n",
    "}\n",
);

const ZH_JUDGE_SYSTEM: &str = concat!(
    "你是\"谁是卧底\"游戏的裁判。请从三个维度为每条发言打分，并以JSON回复。\n\n",
    "# 维度（取值 0, 0.2, 0.4, 0.6, 0.8, 1）\n",
    "1. novelty 新颖度：0 完全重复之前的发言，1 提供全新的角度。\n",
    "2. relevance 相关性：0 与词语无关，0.2 几乎适用于任何事物，1 几乎直接点明词语。\n",
    "3. reasonableness 合理性：0 与词语毫无关联，1 完全符合词语特征。\n\n",
    "# 输出\n",
    "{\n",
    "  \"novelty\": {\"score\": 0.0, \"explanation\": \"...\"},\n",
    "  \"relevance\": {\"score\": 0.0, \"explanation\": \"...\"},\n",
    "  \"reasonableness\": {\"score\": 0.0, \"explanation\": \"...\"}\n",
    "}\n",
);
