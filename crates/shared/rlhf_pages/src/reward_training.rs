//! Toy reward-model training on a single preference pair.

use core::time::Duration;

use serde::Serialize;

use rlhf_viz::reward_model::{demo, pairwise_gradient, PairwiseOutcome, Pooled, RewardPair, RewardTrainer, EMBED_DIM};

use crate::catalog::PageKind;
use crate::error::{PageError, Result};
use crate::params::{self, ParamSpec, REWARD_TRAINING_PARAMS};
use crate::reward_data::{text_tokens, TextField, TextToken};
use crate::stats::TrainingHistory;
use crate::steps::{StepCursor, StepInfo, StepView};

pub const PLAY_INTERVAL: Duration = Duration::from_millis(600);

pub const STEPS: &[StepInfo] = &[StepInfo {
    title: "Pairwise training",
    description: "Pool masked embeddings, score both sides with a linear head, descend −logσ(r⁺ − r⁻)",
}];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideView {
    pub ids: Vec<u32>,
    pub mask: Vec<bool>,
    pub active: usize,
    pub pooled: Pooled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardTrainingSnapshot {
    pub step: StepView,
    pub block_size: usize,
    pub lr: f64,
    pub playing: bool,
    pub steps_taken: u64,
    pub keep: bool,
    pub prompt: Vec<TextToken>,
    pub chosen: SideView,
    pub rejected: SideView,
    /// `pooled_chosen - pooled_rejected`.
    pub feature_diff: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub outcome: PairwiseOutcome,
    pub gradient: Vec<f64>,
    pub history: TrainingHistory,
}

#[derive(Debug, Clone)]
pub struct RewardTrainingPage {
    cursor: StepCursor,
    prompt: String,
    chosen: String,
    rejected: String,
    block_size: usize,
    pair: RewardPair,
    trainer: RewardTrainer,
    history: TrainingHistory,
    playing: bool,
}

impl Default for RewardTrainingPage {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardTrainingPage {
    pub fn new() -> Self {
        let block_size = params::REWARD_TRAINING_BLOCK_SIZE.default as usize;
        let lr = params::REWARD_TRAINING_LR.default;
        Self {
            cursor: StepCursor::new(STEPS.len()),
            prompt: demo::PROMPT.to_string(),
            chosen: demo::CHOSEN.to_string(),
            rejected: demo::REJECTED.to_string(),
            block_size,
            pair: RewardPair::build(demo::PROMPT, demo::CHOSEN, demo::REJECTED, block_size),
            trainer: RewardTrainer::new(EMBED_DIM, lr),
            history: TrainingHistory::new(),
            playing: false,
        }
    }

    /// Start from explicit settings, clamped like slider input.
    pub fn with_settings(block_size: f64, lr: f64) -> Self {
        let mut page = Self::new();
        page.block_size = params::REWARD_TRAINING_BLOCK_SIZE.clamp(block_size) as usize;
        page.trainer.lr = params::REWARD_TRAINING_LR.clamp(lr);
        page.rebuild_pair();
        page
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn trainer(&self) -> &RewardTrainer {
        &self.trainer
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        REWARD_TRAINING_PARAMS
    }

    fn rebuild_pair(&mut self) {
        self.pair = RewardPair::build(&self.prompt, &self.chosen, &self.rejected, self.block_size);
    }

    /// `block_size` and `lr` go through the slider schema; `w0`..`w7` set a
    /// head weight directly.
    pub fn set_param(&mut self, key: &str, value: f64) -> Result<f64> {
        if let Some(i) = key.strip_prefix('w').and_then(|s| s.parse::<usize>().ok()) {
            let len = self.trainer.head.weights.len();
            let w = self
                .trainer
                .head
                .weights
                .get_mut(i)
                .ok_or(PageError::IndexOutOfRange {
                    what: "head weight",
                    index: i,
                    len,
                })?;
            *w = value;
            return Ok(value);
        }

        let spec = params::find(REWARD_TRAINING_PARAMS, key)
            .ok_or_else(|| PageError::unknown_param(PageKind::RewardTraining, key))?;
        let v = spec.clamp(value);
        match key {
            "block_size" => {
                self.block_size = v as usize;
                self.rebuild_pair();
            }
            _ => self.trainer.lr = v,
        }
        Ok(v)
    }

    pub fn set_text(&mut self, field: TextField, text: impl Into<String>) {
        let text = text.into();
        match field {
            TextField::Prompt => self.prompt = text,
            TextField::Chosen => self.chosen = text,
            TextField::Rejected => self.rejected = text,
        }
        self.rebuild_pair();
    }

    fn features(&self) -> Result<(Pooled, Pooled)> {
        Ok((
            self.pair.chosen.pooled(EMBED_DIM)?,
            self.pair.rejected.pooled(EMBED_DIM)?,
        ))
    }

    /// One gradient step; the history records the loss measured before it.
    pub fn sgd_step(&mut self) -> Result<PairwiseOutcome> {
        let (c, r) = self.features()?;
        let outcome = self.trainer.step(&c.rep, &r.rep)?;
        self.history.record(self.trainer.steps, &outcome);
        Ok(outcome)
    }

    /// Manual step. Ignored while playing.
    pub fn next(&mut self) -> Result<bool> {
        if self.playing {
            return Ok(false);
        }
        self.sgd_step()?;
        Ok(true)
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stop, zero the weights and clear the history. Texts and settings stay.
    pub fn reset(&mut self) {
        self.playing = false;
        self.trainer.reset();
        self.history.clear();
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.playing.then_some(PLAY_INTERVAL)
    }

    pub fn tick(&mut self) -> Result<()> {
        if self.playing {
            self.sgd_step()?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<RewardTrainingSnapshot> {
        let (c, r) = self.features()?;
        let outcome = self.trainer.evaluate(&c.rep, &r.rep)?;
        let gradient = pairwise_gradient(outcome.margin, &c.rep, &r.rep)?;
        let feature_diff = c.rep.iter().zip(&r.rep).map(|(a, b)| a - b).collect();
        let side = |packed: &rlhf_viz::reward_model::PackedSide, pooled: Pooled| SideView {
            ids: packed.padded.ids.clone(),
            mask: packed.padded.mask.clone(),
            active: packed.padded.active_count(),
            pooled,
        };

        Ok(RewardTrainingSnapshot {
            step: self.cursor.view(STEPS),
            block_size: self.block_size,
            lr: self.trainer.lr,
            playing: self.playing,
            steps_taken: self.trainer.steps,
            keep: self.pair.kept,
            prompt: text_tokens(&self.prompt),
            chosen: side(&self.pair.chosen, c),
            rejected: side(&self.pair.rejected, r),
            feature_diff,
            weights: self.trainer.head.weights.clone(),
            bias: self.trainer.head.bias,
            outcome,
            gradient,
            history: self.history.clone(),
        })
    }
}
