//! PPO training loop over a synthetic batch.
//!
//! Six prompt/completion sequences carry per-token old log-probs,
//! advantages, returns and old value predictions drawn from a seeded
//! generator. The driver walks eight steps; steps 5 and 6 advance token by
//! token through the current mini-batch. After the backward-pass step the
//! next mini-batch re-enters the forward pass; after the last mini-batch the
//! next update reshuffles and re-enters at the shuffle step; after the last
//! update, play stops.

use core::time::Duration;

use serde::Serialize;

use rlhf_viz::ppo::{minibatch, num_minibatches, token_loss, LossTotals, PpoHyperparams, TokenLoss, TokenLossInput};
use rlhf_viz::prng::Prng;

use crate::catalog::PageKind;
use crate::error::{PageError, Result};
use crate::params::{self, ParamSpec, PPO_PARAMS};
use crate::steps::{StepCursor, StepInfo, StepView};

pub const SAMPLE_BATCH_SIZE: usize = 6;
pub const TRAIN_BATCH_SIZE: usize = 2;
pub const N_UPDATES: usize = 2;

pub const SHUFFLE_STEP: usize = 3;
pub const FORWARD_STEP: usize = 5;
pub const LOSS_STEP: usize = 6;

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "Data Collection",
        description: "Sequences with token-level metrics are gathered from the model.",
    },
    StepInfo {
        title: "Old Log Probs Calculation",
        description: "Compute log-probabilities under the old policy for all tokens of one example (prompts show —).",
    },
    StepInfo {
        title: "GAE Calculation",
        description: "Show A_t and R_t for each generated token with clear Pos/Token mapping.",
    },
    StepInfo {
        title: "Sequence Shuffle",
        description: "Randomly permute the batch before creating mini-batches.",
    },
    StepInfo {
        title: "Mini-Batch Split",
        description: "Split the permuted batch into mini-batches for multiple SGD epochs.",
    },
    StepInfo {
        title: "Forward Pass",
        description: "Run the new policy to get NEW log-probs and value predictions for tokens in this mini-batch.",
    },
    StepInfo {
        title: "PPO & Value Loss",
        description: "Compute per-token losses and visualize them with bar charts and a table.",
    },
    StepInfo {
        title: "Backward Pass",
        description: "Chain rule through policy/value heads; show gradient directions and formula.",
    },
];

const BASE_SEQUENCES: [(&[&str], &[&str]); SAMPLE_BATCH_SIZE] = [
    (&["Where", " is", " Pune", "?"], &[" Pune", " is", " in", " India", "."]),
    (&["Where", " is", " Mumbai", "?"], &[" Mumbai", " is", " in", " India", "."]),
    (&["Where", " is", " Delhi", "?"], &[" Delhi", " is", " in", " India", "."]),
    (&["What", " is", " Pune", "?"], &[" Pune", " is", " a", " city", "."]),
    (&["Where", " is", " Chennai", "?"], &[" Chennai", " is", " in", " India", "."]),
    (&["Where", " is", " Kolkata", "?"], &[" Kolkata", " is", " in", " India", "."]),
];

/// Per-token training state. The scalar fields are `None` on prompt tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PpoToken {
    pub position: usize,
    pub text: &'static str,
    pub is_prompt: bool,
    pub old_log_prob: Option<f64>,
    pub advantage: Option<f64>,
    pub ret: Option<f64>,
    /// Old value prediction; anchors value clipping.
    pub target_value: Option<f64>,
    pub new_log_prob: Option<f64>,
    pub current_value: Option<f64>,
    pub loss: Option<TokenLoss>,
}

impl PpoToken {
    fn prompt(position: usize, text: &'static str) -> Self {
        Self {
            position,
            text,
            is_prompt: true,
            old_log_prob: None,
            advantage: None,
            ret: None,
            target_value: None,
            new_log_prob: None,
            current_value: None,
            loss: None,
        }
    }

    fn generated(position: usize, text: &'static str, rng: &mut Prng) -> Self {
        let old_log_prob = -rng.next_f64_01() * 2.0 - 0.5;
        let advantage = (rng.next_f64_01() - 0.5) * 1.5;
        let ret = rng.next_f64_01() * 2.5 + 1.0;
        let target_value = rng.next_f64_01() * 2.0 + 1.0;
        Self {
            position,
            text,
            is_prompt: false,
            old_log_prob: Some(old_log_prob),
            advantage: Some(advantage),
            ret: Some(ret),
            target_value: Some(target_value),
            new_log_prob: None,
            current_value: None,
            loss: None,
        }
    }

    pub fn is_generated(&self) -> bool {
        !self.is_prompt
    }

    fn clear_forward(&mut self) {
        self.new_log_prob = None;
        self.current_value = None;
        self.loss = None;
    }

    fn loss_input(&self) -> Option<TokenLossInput> {
        let new_log_prob = self.new_log_prob?;
        Some(TokenLossInput {
            old_log_prob: self.old_log_prob?,
            new_log_prob,
            advantage: self.advantage.unwrap_or(0.0),
            ret: self.ret.unwrap_or(0.0),
            value: self.current_value.unwrap_or(0.0),
            target_value: self.target_value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PpoSequence {
    pub id: usize,
    pub tokens: Vec<PpoToken>,
}

impl PpoSequence {
    fn synthesize(id: usize, prompt: &[&'static str], completion: &[&'static str], rng: &mut Prng) -> Self {
        let mut tokens = Vec::with_capacity(prompt.len() + completion.len());
        for (i, &t) in prompt.iter().enumerate() {
            tokens.push(PpoToken::prompt(i, t));
        }
        for (i, &t) in completion.iter().enumerate() {
            tokens.push(PpoToken::generated(prompt.len() + i, t, rng));
        }
        Self { id, tokens }
    }

    pub fn generated(&self) -> impl Iterator<Item = &PpoToken> {
        self.tokens.iter().filter(|t| t.is_generated())
    }

    pub fn generated_count(&self) -> usize {
        self.generated().count()
    }

    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text).collect()
    }

    pub fn totals(&self) -> LossTotals {
        self.generated().filter_map(|t| t.loss.as_ref()).collect()
    }
}

/// The token the driver is pointing at during token-level steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveToken {
    pub sequence: usize,
    pub position: usize,
}

/// Outcome of one driver advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advance {
    Token,
    Step,
    NextMiniBatch,
    NextUpdate,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PpoSnapshot {
    pub step: StepView,
    pub update: usize,
    pub n_updates: usize,
    pub minibatch: usize,
    pub n_minibatches: usize,
    pub token_index: usize,
    pub minibatch_tokens: usize,
    pub active_token: Option<ActiveToken>,
    pub permutation: Vec<usize>,
    pub minibatch_ids: Vec<usize>,
    pub playing: bool,
    pub finished: bool,
    pub speed_ms: u64,
    pub hyperparams: PpoHyperparams,
    pub sequences: Vec<PpoSequence>,
    pub minibatch_totals: LossTotals,
}

#[derive(Debug, Clone)]
pub struct PpoTrainingPage {
    cursor: StepCursor,
    update: usize,
    minibatch: usize,
    token_index: usize,
    permutation: Vec<usize>,
    sequences: Vec<PpoSequence>,
    hp: PpoHyperparams,
    speed_ms: u64,
    playing: bool,
    rng: Prng,
}

impl PpoTrainingPage {
    pub fn new(seed: u64) -> Self {
        let mut rng = Prng::new(seed);
        let sequences = Self::synthesize(&mut rng);
        Self {
            cursor: StepCursor::new(STEPS.len()),
            update: 0,
            minibatch: 0,
            token_index: 0,
            permutation: (0..SAMPLE_BATCH_SIZE).collect(),
            sequences,
            hp: PpoHyperparams::default(),
            speed_ms: default_speed_ms(),
            playing: false,
            rng,
        }
    }

    /// Start with explicit hyperparameters and playback delay (clamped).
    pub fn with_settings(seed: u64, hp: PpoHyperparams, speed_ms: u64) -> Self {
        let mut page = Self::new(seed);
        page.hp = PpoHyperparams {
            clip_eps: params::PPO_CLIP_EPS.clamp(hp.clip_eps),
            value_coef: params::PPO_VALUE_COEF.clamp(hp.value_coef),
            entropy_coef: params::PPO_ENTROPY_COEF.clamp(hp.entropy_coef),
            use_value_clip: hp.use_value_clip,
            value_clip_range: params::PPO_VALUE_CLIP_RANGE.clamp(hp.value_clip_range),
        };
        page.speed_ms = params::PPO_SPEED_MS.clamp(speed_ms as f64) as u64;
        page
    }

    fn synthesize(rng: &mut Prng) -> Vec<PpoSequence> {
        BASE_SEQUENCES
            .iter()
            .enumerate()
            .map(|(id, (prompt, completion))| PpoSequence::synthesize(id, prompt, completion, rng))
            .collect()
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn update(&self) -> usize {
        self.update
    }

    pub fn minibatch_index(&self) -> usize {
        self.minibatch
    }

    pub fn token_index(&self) -> usize {
        self.token_index
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn sequences(&self) -> &[PpoSequence] {
        &self.sequences
    }

    pub fn hyperparams(&self) -> &PpoHyperparams {
        &self.hp
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn n_minibatches(&self) -> usize {
        num_minibatches(SAMPLE_BATCH_SIZE, TRAIN_BATCH_SIZE)
    }

    pub fn minibatch_ids(&self) -> &[usize] {
        minibatch(&self.permutation, self.minibatch, TRAIN_BATCH_SIZE)
    }

    fn minibatch_token_count(&self) -> usize {
        self.minibatch_ids()
            .iter()
            .filter_map(|&id| self.sequences.get(id))
            .map(PpoSequence::generated_count)
            .sum()
    }

    /// Generated tokens of the current mini-batch in visiting order.
    fn minibatch_tokens(&self) -> Vec<ActiveToken> {
        self.minibatch_ids()
            .iter()
            .filter_map(|&id| self.sequences.get(id))
            .flat_map(|seq| {
                seq.generated().map(move |t| ActiveToken {
                    sequence: seq.id,
                    position: t.position,
                })
            })
            .collect()
    }

    fn is_token_level(&self) -> bool {
        matches!(self.cursor.index(), FORWARD_STEP | LOSS_STEP)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_last()
            && self.minibatch + 1 >= self.n_minibatches()
            && self.update + 1 >= N_UPDATES
    }

    /// Advance the driver by one token or one step.
    pub fn advance(&mut self) -> Advance {
        let total = self.minibatch_token_count();
        if self.is_token_level() && total > 0 && self.token_index + 1 < total {
            self.token_index += 1;
            return Advance::Token;
        }

        let outcome = if !self.cursor.is_last() {
            self.cursor.advance();
            Advance::Step
        } else if self.minibatch + 1 < self.n_minibatches() {
            self.minibatch += 1;
            self.cursor.jump_to(FORWARD_STEP);
            Advance::NextMiniBatch
        } else if self.update + 1 < N_UPDATES {
            self.update += 1;
            self.minibatch = 0;
            self.permutation = self.rng.permutation(SAMPLE_BATCH_SIZE);
            self.cursor.jump_to(SHUFFLE_STEP);
            Advance::NextUpdate
        } else {
            self.playing = false;
            return Advance::Finished;
        };

        self.token_index = 0;
        self.enter_step();
        outcome
    }

    fn enter_step(&mut self) {
        match self.cursor.index() {
            SHUFFLE_STEP => {
                for seq in &mut self.sequences {
                    seq.tokens.iter_mut().for_each(PpoToken::clear_forward);
                }
            }
            FORWARD_STEP => self.forward_pass(),
            LOSS_STEP => self.compute_losses(),
            _ => {}
        }
    }

    /// Perturb the old policy into a "new" one for the current mini-batch.
    /// Runs once per mini-batch per update.
    fn forward_pass(&mut self) {
        let ids: Vec<usize> = self.minibatch_ids().to_vec();
        let already = ids
            .first()
            .and_then(|&id| self.sequences.get(id))
            .and_then(|seq| seq.generated().next())
            .is_some_and(|t| t.new_log_prob.is_some());
        if already {
            return;
        }

        for id in ids {
            let Some(seq) = self.sequences.get_mut(id) else {
                continue;
            };
            for tok in seq.tokens.iter_mut().filter(|t| t.is_generated()) {
                tok.new_log_prob = Some(tok.old_log_prob.unwrap_or(0.0) + self.rng.jitter(0.2));
                tok.current_value = Some(tok.target_value.unwrap_or(0.0) + self.rng.jitter(0.25));
            }
        }
    }

    /// Losses for every token that has been through a forward pass.
    fn compute_losses(&mut self) {
        let hp = self.hp;
        for tok in self.sequences.iter_mut().flat_map(|s| s.tokens.iter_mut()) {
            if let Some(input) = tok.loss_input() {
                tok.loss = Some(token_loss(&input, &hp));
            }
        }
    }

    /// Manual Next. Disabled while playing.
    pub fn next(&mut self) -> Option<Advance> {
        if self.playing {
            return None;
        }
        Some(self.advance())
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Back to step 0 with freshly synthesized data and the identity order.
    /// Hyperparameters and speed are kept.
    pub fn reset(&mut self) {
        self.playing = false;
        self.cursor.reset();
        self.update = 0;
        self.minibatch = 0;
        self.token_index = 0;
        self.sequences = Self::synthesize(&mut self.rng);
        self.permutation = (0..SAMPLE_BATCH_SIZE).collect();
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.playing.then(|| Duration::from_millis(self.speed_ms))
    }

    pub fn tick(&mut self) {
        if self.playing {
            self.advance();
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        PPO_PARAMS
    }

    pub fn set_param(&mut self, key: &str, value: f64) -> Result<f64> {
        let spec = params::find(PPO_PARAMS, key).ok_or_else(|| PageError::unknown_param(PageKind::Ppo, key))?;
        let v = spec.clamp(value);
        match key {
            "clip_eps" => self.hp.clip_eps = v,
            "value_coef" => self.hp.value_coef = v,
            "entropy_coef" => self.hp.entropy_coef = v,
            "use_value_clip" => self.hp.use_value_clip = v >= 0.5,
            "value_clip_range" => self.hp.value_clip_range = v,
            _ => self.speed_ms = v as u64,
        }
        if self.cursor.index() == LOSS_STEP {
            self.compute_losses();
        }
        Ok(v)
    }

    pub fn snapshot(&self) -> PpoSnapshot {
        let tokens = self.minibatch_tokens();
        let active_token = if self.is_token_level() {
            tokens.get(self.token_index).copied()
        } else {
            None
        };
        let minibatch_totals = self
            .minibatch_ids()
            .iter()
            .filter_map(|&id| self.sequences.get(id))
            .flat_map(|s| s.generated().filter_map(|t| t.loss.as_ref()))
            .collect();

        PpoSnapshot {
            step: self.cursor.view(STEPS),
            update: self.update,
            n_updates: N_UPDATES,
            minibatch: self.minibatch,
            n_minibatches: self.n_minibatches(),
            token_index: self.token_index,
            minibatch_tokens: tokens.len(),
            active_token,
            permutation: self.permutation.clone(),
            minibatch_ids: self.minibatch_ids().to_vec(),
            playing: self.playing,
            finished: self.is_finished(),
            speed_ms: self.speed_ms,
            hyperparams: self.hp,
            sequences: self.sequences.clone(),
            minibatch_totals,
        }
    }
}

fn default_speed_ms() -> u64 {
    params::PPO_SPEED_MS.default as u64
}
