//! # Game Engine
//!
//! Owns the game state and drives the round lifecycle:
//!
//! ```text
//! setup ─► round 1 ─► round 2 ─► … ─► finished
//!            │
//!            ├─ statement phase: each alive player speaks, judges score,
//!            │                   low scores eliminate on the spot
//!            ├─ voting phase (every `roundsBeforeVoting` rounds)
//!            └─ win check
//! ```
//!
//! Everything runs sequentially on the caller's task. Agent failures are
//! contained per player; only engine setup can fail a game.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use undercover_error::{Error, Result};
use undercover_llm::{ChatCapability, ProviderRegistry, RetryPolicy, Retrying};

use crate::config::{AgentSpec, GameConfig};
use crate::event::{EventSink, GameEvent, NoopSink};
use crate::judge::Judge;
use crate::player::Player;
use crate::rules::{check_win, plurality, tally_votes, REASON_MAX_ROUNDS};
use crate::types::{
    EliminationCause, EliminationRecord, GameResult, GameState, Phase, PlayerId, Role,
    RoundPhase, ScoreBundle, StatementRecord, VoteRecord, Winner,
};

pub struct GameEngine {
    config: GameConfig,
    registry: ProviderRegistry,
    players: Vec<Player>,
    judges: Vec<Judge>,
    state: GameState,
    sink: Box<dyn EventSink>,
    rng: StdRng,
    is_setup: bool,
}

impl GameEngine {
    /// Validate the config and check every agent's provider is registered
    pub fn new(config: GameConfig, registry: ProviderRegistry) -> Result<Self> {
        config.validate()?;
        for spec in config.players.iter().chain(&config.judges) {
            registry
                .get(spec.provider)
                .map_err(|e| e.with_operation("engine::new").with_context("agent", spec.to_string()))?;
        }

        Ok(Self {
            config,
            registry,
            players: Vec::new(),
            judges: Vec::new(),
            state: GameState::default(),
            sink: Box::new(NoopSink),
            rng: StdRng::from_os_rng(),
            is_setup: false,
        })
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Fix the seed for role assignment and fallback votes
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn judges(&self) -> &[Judge] {
        &self.judges
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Create players and judges and deal the roles.
    ///
    /// Ids are shuffled with Fisher-Yates; the first `undercoverCount` ids
    /// after shuffling play undercover.
    pub fn setup(&mut self) -> Result<()> {
        if self.is_setup {
            return Err(Error::unexpected("game is already set up").with_operation("engine::setup"));
        }

        let mut ids: Vec<PlayerId> = (1..=self.config.player_count as PlayerId).collect();
        for i in (1..ids.len()).rev() {
            let j = self.rng.random_range(0..=i);
            ids.swap(i, j);
        }
        let undercover = &ids[..self.config.undercover_count];

        let policy = self.config.retry_policy();
        let language = self.config.language;
        let pair = &self.config.concept_pair;

        let mut players = Vec::with_capacity(self.config.player_count);
        for (index, spec) in self.config.players.iter().enumerate() {
            let id = index as PlayerId + 1;
            let role = if undercover.contains(&id) {
                Role::Undercover
            } else {
                Role::Civilian
            };
            let chat = retrying_chat(&self.registry, spec, &policy)?;
            let rng = StdRng::seed_from_u64(self.rng.random());
            players.push(Player::new(
                id,
                spec.clone(),
                role,
                pair.concept_for(role),
                language,
                chat,
                rng,
            ));
        }

        let mut judges = Vec::with_capacity(self.config.judges.len());
        for (index, spec) in self.config.judges.iter().enumerate() {
            let chat = retrying_chat(&self.registry, spec, &policy)?;
            judges.push(Judge::new(
                format!("judge_{}", index + 1),
                spec.clone(),
                language,
                chat,
            ));
        }

        self.players = players;
        self.judges = judges;
        self.is_setup = true;

        log::info!(
            "[engine] set up {} players ({} undercover) and {} judges",
            self.players.len(),
            self.config.undercover_count,
            self.judges.len()
        );

        self.emit(GameEvent::GameSetup {
            players: self.players.iter().map(Player::summary).collect(),
            judges: self.judges.iter().map(Judge::summary).collect(),
            concept_pair: self.config.concept_pair.clone(),
        });
        Ok(())
    }

    // ========================================================================
    // Main loop
    // ========================================================================

    /// Play the game to the end and return the final snapshot.
    ///
    /// Runs `setup` first if it has not been called.
    pub async fn run(&mut self) -> Result<GameResult> {
        if !self.is_setup {
            self.setup()?;
        }
        if self.state.game_over {
            return Err(Error::unexpected("game has already finished").with_operation("engine::run"));
        }

        self.state.phase = Phase::Playing;
        self.emit(GameEvent::GameStart {
            player_count: self.config.player_count,
            undercover_count: self.config.undercover_count,
            max_rounds: self.config.max_rounds,
        });

        while !self.state.game_over && self.state.round < self.config.max_rounds {
            self.state.round += 1;
            log::info!("[engine] round {}", self.state.round);

            self.statement_phase().await;

            if self.state.round % self.config.rounds_before_voting == 0 {
                self.voting_phase().await;
            }

            if let Some((winner, reason)) = self.check_win() {
                self.end_game(winner, reason);
            }
        }

        if !self.state.game_over {
            self.end_game(Winner::Draw, REASON_MAX_ROUNDS);
        }

        self.result()
            .ok_or_else(|| Error::unexpected("finished game has no winner").with_operation("engine::run"))
    }

    // ========================================================================
    // Statement phase
    // ========================================================================

    async fn statement_phase(&mut self) {
        let round = self.state.round;
        self.emit(GameEvent::RoundStart {
            round,
            phase: RoundPhase::Statements,
        });

        let speakers: Vec<usize> = self.alive_indices();
        for idx in speakers {
            if self.players[idx].is_eliminated() {
                continue;
            }
            let player_id = self.players[idx].id();
            let alive = self.alive_ids();
            self.emit(GameEvent::PlayerTurn {
                round,
                player_id,
                phase: RoundPhase::Statements,
            });

            let history = self.state.history_text();
            let decision = match self.players[idx].generate_statement(&history, &alive).await {
                Ok(decision) => decision,
                Err(err) => {
                    log::warn!("[engine] player {} failed to speak: {}", player_id, err);
                    self.emit(GameEvent::Error {
                        phase: RoundPhase::Statements,
                        player_id,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            log::debug!("[engine] player {}: {}", player_id, decision.statement);
            let record = StatementRecord {
                round,
                player_id,
                statement: decision.statement,
                identity: decision.identity,
                strategy: decision.strategy,
                scores: None,
            };
            self.state.statements.push(record.clone());
            self.emit(GameEvent::StatementGenerated { statement: record.clone() });

            if self.judges.is_empty() {
                continue;
            }

            let player = &self.players[idx];
            let concept = player.concept().to_string();
            let other = self.config.concept_pair.other_concept(player.role()).to_string();
            let history = self.state.history_text();
            let bundle = evaluate(&self.judges, &concept, &other, &record.statement, &history).await;

            if let Some(last) = self.state.statements.last_mut() {
                last.scores = Some(bundle.clone());
            }
            let average = bundle.average;
            self.emit(GameEvent::StatementEvaluated {
                round,
                player_id,
                scores: bundle,
            });

            match average {
                Some(avg) if avg < self.config.elimination_threshold => {
                    log::info!(
                        "[engine] player {} scored {:.2}, below {:.2}",
                        player_id,
                        avg,
                        self.config.elimination_threshold
                    );
                    self.eliminate(idx, EliminationCause::LowScore, None);
                }
                Some(_) => {}
                None => log::warn!("[engine] no judge scored player {}", player_id),
            }
        }

        self.emit(GameEvent::RoundEnd {
            round,
            phase: RoundPhase::Statements,
        });
    }

    // ========================================================================
    // Voting phase
    // ========================================================================

    async fn voting_phase(&mut self) {
        let round = self.state.round;
        self.emit(GameEvent::RoundStart {
            round,
            phase: RoundPhase::Voting,
        });

        let alive = self.alive_ids();
        let history = self.state.history_text();
        let mut votes: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();

        for &voter in &alive {
            let Some(idx) = self.index_of(voter) else {
                continue;
            };
            match self.players[idx].generate_vote(&history, &alive).await {
                Ok(decision) => {
                    votes.insert(voter, decision.vote);
                    self.emit(GameEvent::VoteGenerated {
                        round,
                        voter_id: voter,
                        voted_for: decision.vote,
                    });
                }
                Err(err) => {
                    let targets: Vec<PlayerId> =
                        alive.iter().copied().filter(|&id| id != voter).collect();
                    if targets.is_empty() {
                        log::warn!("[engine] player {} abstains: {}", voter, err);
                        continue;
                    }
                    let target = targets[self.rng.random_range(0..targets.len())];
                    log::warn!(
                        "[engine] player {} failed to vote, assigned {}: {}",
                        voter,
                        target,
                        err
                    );
                    votes.insert(voter, target);
                }
            }
        }

        let tally = tally_votes(&votes, &alive);
        let eliminated = plurality(&tally).and_then(|target| {
            let idx = self.index_of(target)?;
            let received = tally.get(&target).copied();
            self.eliminate(idx, EliminationCause::VotedOut, received);
            Some(target)
        });

        self.state.votes.push(VoteRecord {
            round,
            votes,
            tally,
            eliminated,
        });

        self.emit(GameEvent::RoundEnd {
            round,
            phase: RoundPhase::Voting,
        });
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    fn eliminate(&mut self, idx: usize, cause: EliminationCause, votes: Option<u32>) {
        let round = self.state.round;
        let player = &mut self.players[idx];
        player.eliminate(round);

        let record = EliminationRecord {
            player_id: player.id(),
            round,
            cause,
            role: player.role(),
            votes,
        };
        log::info!(
            "[engine] player {} ({}) eliminated: {}",
            record.player_id,
            record.role,
            cause
        );
        self.state.eliminations.push(record.clone());
        self.emit(GameEvent::PlayerEliminated { elimination: record });
    }

    fn check_win(&self) -> Option<(Winner, &'static str)> {
        let alive = self.players.iter().filter(|p| !p.is_eliminated());
        let (undercover, civilians): (Vec<&Player>, Vec<&Player>) =
            alive.partition(|p| p.role() == Role::Undercover);
        check_win(civilians.len(), undercover.len())
    }

    fn end_game(&mut self, winner: Winner, reason: &str) {
        self.state.game_over = true;
        self.state.winner = Some(winner);
        self.state.reason = Some(reason.to_string());
        self.state.phase = Phase::Finished;

        log::info!(
            "[engine] game over after {} rounds: {} ({})",
            self.state.round,
            winner,
            reason
        );

        let final_state = self.snapshot(winner, reason);
        self.emit(GameEvent::GameEnd {
            winner,
            reason: reason.to_string(),
            final_state: Box::new(final_state),
        });
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Final result, once the game has finished
    pub fn result(&self) -> Option<GameResult> {
        let winner = self.state.winner?;
        let reason = self.state.reason.as_deref().unwrap_or_default();
        Some(self.snapshot(winner, reason))
    }

    fn snapshot(&self, winner: Winner, reason: &str) -> GameResult {
        GameResult {
            player_count: self.config.player_count,
            undercover_count: self.config.undercover_count,
            concept_pair: self.config.concept_pair.clone(),
            language: self.config.language,
            players: self.players.iter().map(Player::summary).collect(),
            judges: self.judges.iter().map(Judge::summary).collect(),
            statements: self.state.statements.clone(),
            votes: self.state.votes.clone(),
            eliminations: self.state.eliminations.clone(),
            winner,
            reason: reason.to_string(),
            total_rounds: self.state.round,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn alive_indices(&self) -> Vec<usize> {
        (0..self.players.len())
            .filter(|&i| !self.players[i].is_eliminated())
            .collect()
    }

    /// Alive player ids, ascending
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| !p.is_eliminated())
            .map(Player::id)
            .collect()
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.id() == id && !p.is_eliminated())
    }

    fn emit(&mut self, event: GameEvent) {
        log::trace!("[engine] emit {}", event.name());
        self.sink.emit(&event);
    }
}

fn retrying_chat(
    registry: &ProviderRegistry,
    spec: &AgentSpec,
    policy: &RetryPolicy,
) -> Result<Arc<dyn ChatCapability>> {
    let inner = registry.get(spec.provider)?;
    Ok(Arc::new(Retrying::new(inner, policy.clone())))
}

/// Ask every judge in order and aggregate
async fn evaluate(
    judges: &[Judge],
    concept: &str,
    other_concept: &str,
    statement: &str,
    history: &str,
) -> ScoreBundle {
    let mut evaluations = Vec::with_capacity(judges.len());
    for judge in judges {
        evaluations.push(
            judge
                .evaluate_statement(concept, other_concept, statement, history)
                .await,
        );
    }
    ScoreBundle::from_evaluations(evaluations)
}
