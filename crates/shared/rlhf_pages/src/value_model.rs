use core::time::Duration;

use serde::Serialize;

use crate::steps::{StepCursor, StepInfo, StepView};

pub const PHASE_INTERVAL: Duration = Duration::from_secs(1);
pub const PHASES: usize = 4;

pub const TOKEN: &str = "Where";
pub const TOKEN_ID: u32 = 2940;
pub const EMBEDDING: [f64; 8] = [0.1, -0.3, 0.8, 0.2, -0.1, 0.7, -0.4, 0.5];
pub const TRANSFORMER_OUTPUT: [f64; 8] = [0.2, 0.6, -0.2, 0.9, 0.1, -0.3, 0.4, -0.1];
pub const FINAL_VALUE: f64 = 0.73;
pub const HIDDEN_DIM: usize = 768;

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "Token Input & Embedding",
        description: "Follow the journey of token 'Where' as it gets converted to embeddings",
    },
    StepInfo {
        title: "Transformer Processing",
        description: "Watch how the token flows through attention and feed-forward layers",
    },
    StepInfo {
        title: "Value Prediction Network",
        description: "See the detailed neural network that converts 768 dimensions to 1 value",
    },
    StepInfo {
        title: "Final Value Output",
        description: "The complete journey results in a single scalar value",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueModelSnapshot {
    pub step: StepView,
    pub phase: usize,
    pub token: &'static str,
    pub token_id: u32,
    pub hidden_dim: usize,
    pub embedding: Vec<f64>,
    /// Present from the transformer step on.
    pub transformer_output: Option<Vec<f64>>,
    pub head: &'static str,
    /// Present on the final step.
    pub value: Option<f64>,
}

/// A single token's path from id to scalar value estimate.
#[derive(Debug, Clone)]
pub struct ValueModelPage {
    cursor: StepCursor,
    phase: usize,
}

impl Default for ValueModelPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueModelPage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            phase: 0,
        }
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn next(&mut self) -> bool {
        let moved = self.cursor.advance();
        if moved {
            self.phase = 0;
        }
        moved
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.phase = 0;
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        (self.cursor.index() > 0).then_some(PHASE_INTERVAL)
    }

    pub fn tick(&mut self) {
        if self.cursor.index() > 0 {
            self.phase = (self.phase + 1) % PHASES;
        }
    }

    pub fn snapshot(&self) -> ValueModelSnapshot {
        let step = self.cursor.index();
        ValueModelSnapshot {
            step: self.cursor.view(STEPS),
            phase: self.phase,
            token: TOKEN,
            token_id: TOKEN_ID,
            hidden_dim: HIDDEN_DIM,
            embedding: EMBEDDING.to_vec(),
            transformer_output: (step >= 1).then(|| TRANSFORMER_OUTPUT.to_vec()),
            head: "value = W·h + b, W: [768 × 1]",
            value: (step >= 3).then_some(FINAL_VALUE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_cycle_after_first_step() {
        let mut page = ValueModelPage::new();
        assert!(page.tick_interval().is_none());
        page.tick();
        assert_eq!(page.phase(), 0);

        page.next();
        assert_eq!(page.tick_interval(), Some(PHASE_INTERVAL));
        for _ in 0..5 {
            page.tick();
        }
        assert_eq!(page.phase(), 1);

        page.next();
        assert_eq!(page.phase(), 0);
    }

    #[test]
    fn value_is_revealed_on_final_step() {
        let mut page = ValueModelPage::new();
        assert!(page.snapshot().value.is_none());
        while page.next() {}
        let snap = page.snapshot();
        assert_eq!(snap.value, Some(FINAL_VALUE));
        assert_eq!(snap.transformer_output.map(|v| v.len()), Some(8));
        page.reset();
        assert_eq!(page.cursor().index(), 0);
        assert!(page.tick_interval().is_none());
    }
}
