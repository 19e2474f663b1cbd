//! KL-penalized scores and the GAE backward pass over the running example.

use core::time::Duration;

use serde::Serialize;

use rlhf_viz::gae::{self, demo, gae_trace, kl_divergence, kl_penalized_scores, GaeParams, GaeStep};
use rlhf_viz::tokens::demo as text;

use crate::error::Result;
use crate::steps::{StepCursor, StepInfo, StepView};

pub const CALC_INTERVAL: Duration = Duration::from_secs(2);

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "1. Log Probabilities",
        description: "Compare original model log probs with reference model log probs for all tokens",
    },
    StepInfo {
        title: "2. KL Divergence & Scores",
        description: "Calculate KL penalty and combine with reward to get scores",
    },
    StepInfo {
        title: "3. Value Predictions",
        description: "Get value estimates for each token position from the value model",
    },
    StepInfo {
        title: "4. GAE Advantage Calculation",
        description: "Calculate advantages using Generalized Advantage Estimation for all positions",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvantageSnapshot {
    pub step: StepView,
    pub tokens: Vec<&'static str>,
    pub policy_log_probs: Vec<f64>,
    pub reference_log_probs: Vec<f64>,
    pub kl: Option<Vec<f64>>,
    pub scores: Option<Vec<f64>>,
    pub values: Option<Vec<f64>>,
    pub params: GaeParams,
    pub reward: f64,
    pub kl_beta: f64,
    pub calculation_step: usize,
    pub highlighted: Option<usize>,
    /// Recursion iteration for the highlighted position.
    pub current: Option<GaeStep>,
    pub advantages: Option<Vec<f64>>,
    pub returns: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct AdvantagePage {
    cursor: StepCursor,
    calculation_step: usize,
    policy: Vec<f64>,
    reference: Vec<f64>,
    values: Vec<f64>,
    reward: f64,
    kl_beta: f64,
    params: GaeParams,
}

impl Default for AdvantagePage {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvantagePage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            calculation_step: 0,
            policy: demo::POLICY_LOG_PROBS.to_vec(),
            reference: demo::REF_LOG_PROBS.to_vec(),
            values: demo::VALUES.to_vec(),
            reward: demo::REWARD,
            kl_beta: demo::KL_BETA,
            params: GaeParams {
                gamma: demo::GAMMA,
                lambda: demo::LAMBDA,
            },
        }
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    /// Number of scored positions: one per policy token plus the terminal
    /// reward.
    pub fn positions(&self) -> usize {
        self.policy.len() + 1
    }

    pub fn calculation_step(&self) -> usize {
        self.calculation_step
    }

    /// Position being filled by the backward pass, last first. `None` on the
    /// pause frame after position 0.
    pub fn highlighted(&self) -> Option<usize> {
        let n = self.positions();
        (self.calculation_step < n).then(|| n - 1 - self.calculation_step)
    }

    pub fn next(&mut self) -> bool {
        let moved = self.cursor.advance();
        if moved {
            self.calculation_step = 0;
        }
        moved
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.calculation_step = 0;
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        (self.cursor.index() == 3).then_some(CALC_INTERVAL)
    }

    pub fn tick(&mut self) {
        if self.cursor.index() == 3 {
            self.calculation_step = (self.calculation_step + 1) % (self.positions() + 1);
        }
    }

    pub fn snapshot(&self) -> Result<AdvantageSnapshot> {
        let step = self.cursor.index();
        let kl = kl_divergence(&self.policy, &self.reference)?;
        let scores = kl_penalized_scores(&self.policy, &self.reference, self.kl_beta, self.reward)?;
        let trace = gae_trace(&scores, &self.values, self.params)?;
        let result = gae::compute_gae(&scores, &self.values, self.params)?;

        let highlighted = self.highlighted().filter(|_| step == 3);
        let current = highlighted.and_then(|t| trace.iter().find(|s| s.t == t).copied());

        Ok(AdvantageSnapshot {
            step: self.cursor.view(STEPS),
            tokens: text::COMPLETION.to_vec(),
            policy_log_probs: self.policy.clone(),
            reference_log_probs: self.reference.clone(),
            kl: (step >= 1).then_some(kl),
            scores: (step >= 1).then_some(scores),
            values: (step >= 2).then(|| self.values.clone()),
            params: self.params,
            reward: self.reward,
            kl_beta: self.kl_beta,
            calculation_step: self.calculation_step,
            highlighted,
            current,
            advantages: (step >= 3).then(|| result.advantages.clone()),
            returns: (step >= 3).then_some(result.returns),
        })
    }
}
