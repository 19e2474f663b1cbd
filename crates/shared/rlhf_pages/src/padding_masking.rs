use core::time::Duration;

use serde::Serialize;

use rlhf_viz::padding::{action_mask, pad_values};
use rlhf_viz::tokens::{demo, shift_for_next_token};

use crate::steps::{StepCursor, StepInfo, StepView};

pub const BLOCK_SIZE: usize = 16;
pub const SCAN_INTERVAL: Duration = Duration::from_millis(300);
pub const PAD_TOKEN: &str = "<PAD>";

pub const ADVANTAGES: [f64; 9] = [0.12, 0.34, -0.15, 0.67, 0.89, 0.23, -0.45, 0.78, 0.91];
pub const RETURNS: [f64; 9] = [1.2, 1.4, 1.1, 1.8, 2.1, 2.3, 2.0, 2.7, 2.9];
/// One per target token, so one shorter than the completion.
pub const LOG_PROBS: [f64; 8] = [-1.2, -0.8, -2.1, -1.5, -0.9, -0.7, -1.8, -1.1];

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "1. Original Data",
        description: "Start with unpadded sequences of different lengths",
    },
    StepInfo {
        title: "2. Pad Advantages & Returns",
        description: "Pad advantages and returns to block_size with zeros",
    },
    StepInfo {
        title: "3. Pad Log Probabilities",
        description: "Pad log probabilities to block_size with zeros",
    },
    StepInfo {
        title: "4. Pad Token Sequences",
        description: "Pad completion and target sequences with zeros",
    },
    StepInfo {
        title: "5. Create Action Mask",
        description: "Create mask to identify generated tokens vs padding",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaddingSnapshot {
    pub step: StepView,
    pub block_size: usize,
    pub prompt_len: usize,
    pub completion: Vec<&'static str>,
    pub target: Vec<&'static str>,
    pub advantages: Vec<f64>,
    pub returns: Vec<f64>,
    pub log_probs: Vec<f64>,
    pub padded_advantages: Option<Vec<f64>>,
    pub padded_returns: Option<Vec<f64>>,
    pub padded_log_probs: Option<Vec<f64>>,
    pub padded_completion: Option<Vec<&'static str>>,
    pub padded_target: Option<Vec<&'static str>>,
    /// `true` on generated positions only.
    pub action_mask: Option<Vec<bool>>,
    /// Scan position; indices `>= block_size` are pause frames.
    pub animated_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PaddingMaskingPage {
    cursor: StepCursor,
    animated_index: Option<usize>,
}

impl Default for PaddingMaskingPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PaddingMaskingPage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            animated_index: None,
        }
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn animated_index(&self) -> Option<usize> {
        self.animated_index
    }

    pub fn next(&mut self) -> bool {
        let moved = self.cursor.advance();
        if moved {
            self.animated_index = None;
        }
        moved
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.animated_index = None;
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        (self.cursor.index() > 0).then_some(SCAN_INTERVAL)
    }

    pub fn tick(&mut self) {
        if self.cursor.index() == 0 {
            return;
        }
        self.animated_index = Some(match self.animated_index {
            None => 0,
            Some(i) => (i + 1) % (BLOCK_SIZE + 2),
        });
    }

    pub fn snapshot(&self) -> PaddingSnapshot {
        let step = self.cursor.index();
        let (_, target) = shift_for_next_token(demo::COMPLETION);
        let completion_len = demo::COMPLETION.len();

        PaddingSnapshot {
            step: self.cursor.view(STEPS),
            block_size: BLOCK_SIZE,
            prompt_len: demo::PROMPT.len(),
            completion: demo::COMPLETION.to_vec(),
            target: target.to_vec(),
            advantages: ADVANTAGES.to_vec(),
            returns: RETURNS.to_vec(),
            log_probs: LOG_PROBS.to_vec(),
            padded_advantages: (step >= 1).then(|| pad_values(&ADVANTAGES, BLOCK_SIZE, 0.0)),
            padded_returns: (step >= 1).then(|| pad_values(&RETURNS, BLOCK_SIZE, 0.0)),
            padded_log_probs: (step >= 2).then(|| pad_values(&LOG_PROBS, BLOCK_SIZE, 0.0)),
            padded_completion: (step >= 3).then(|| pad_values(demo::COMPLETION, BLOCK_SIZE, PAD_TOKEN)),
            padded_target: (step >= 3).then(|| pad_values(target, BLOCK_SIZE, PAD_TOKEN)),
            action_mask: (step >= 4).then(|| action_mask(demo::PROMPT.len(), completion_len, BLOCK_SIZE)),
            animated_index: self.animated_index,
        }
    }
}
