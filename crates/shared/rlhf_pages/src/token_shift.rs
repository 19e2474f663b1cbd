//! Next-token shifting: a completion becomes (input, target) pairs offset by
//! one position.

use core::time::Duration;

use serde::Serialize;

use rlhf_viz::tokens::{demo, shift_for_next_token, Sequence, TokenRole};

use crate::steps::{StepCursor, StepInfo, StepView};

pub const TRANSITION: Duration = Duration::from_millis(300);

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "1. Model Generation",
        description: "The model generates a completion including both prompt and response",
    },
    StepInfo {
        title: "2. Token Sequence",
        description: "The complete sequence is tokenized into individual tokens",
    },
    StepInfo {
        title: "3. Input-Target Splitting",
        description: "Split into input sequence (all but last) and target sequence (all but first)",
    },
    StepInfo {
        title: "4. Training Pairs",
        description: "Each input token predicts the next target token for training",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenCell {
    pub text: String,
    pub id: Option<u32>,
    pub role: TokenRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingPair {
    pub position: usize,
    pub input: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenShiftSnapshot {
    pub step: StepView,
    pub transitioning: bool,
    pub prompt: String,
    pub response: String,
    pub tokens: Vec<TokenCell>,
    /// Present from the splitting step on.
    pub inputs: Option<Vec<String>>,
    pub targets: Option<Vec<String>>,
    /// Present on the final step.
    pub pairs: Option<Vec<TrainingPair>>,
}

#[derive(Debug, Clone)]
pub struct TokenShiftPage {
    cursor: StepCursor,
    transitioning: bool,
    sequence: Sequence,
}

impl Default for TokenShiftPage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenShiftPage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            transitioning: false,
            sequence: demo::sequence(),
        }
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Starts the transition to the next step; the step changes on the
    /// following tick. Ignored on the last step or mid-transition.
    pub fn next(&mut self) -> bool {
        if self.transitioning || self.cursor.is_last() {
            return false;
        }
        self.transitioning = true;
        true
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.transitioning = false;
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.transitioning.then_some(TRANSITION)
    }

    pub fn tick(&mut self) {
        if self.transitioning {
            self.transitioning = false;
            self.cursor.advance();
        }
    }

    pub fn snapshot(&self) -> TokenShiftSnapshot {
        let texts = self.sequence.texts();
        let (inputs, targets) = shift_for_next_token(&texts);
        let step = self.cursor.index();

        let pairs = (step >= 3).then(|| {
            inputs
                .iter()
                .zip(targets)
                .enumerate()
                .map(|(position, (input, target))| TrainingPair {
                    position,
                    input: input.to_string(),
                    target: target.to_string(),
                })
                .collect()
        });

        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        TokenShiftSnapshot {
            step: self.cursor.view(STEPS),
            transitioning: self.transitioning,
            prompt: demo::PROMPT.concat(),
            response: demo::RESPONSE.concat(),
            tokens: self
                .sequence
                .tokens
                .iter()
                .map(|t| TokenCell {
                    text: t.text.clone(),
                    id: t.id,
                    role: t.role,
                })
                .collect(),
            inputs: (step >= 2).then(|| owned(inputs)),
            targets: (step >= 2).then(|| owned(targets)),
            pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_waits_for_the_transition_tick() {
        let mut page = TokenShiftPage::new();
        assert!(page.tick_interval().is_none());
        assert!(page.next());
        assert_eq!(page.tick_interval(), Some(TRANSITION));
        assert!(!page.next());
        assert_eq!(page.cursor().index(), 0);
        page.tick();
        assert_eq!(page.cursor().index(), 1);
        assert!(!page.is_transitioning());
    }

    #[test]
    fn never_passes_the_last_step() {
        let mut page = TokenShiftPage::new();
        for _ in 0..10 {
            page.next();
            page.tick();
        }
        assert_eq!(page.cursor().index(), 3);
        assert!(!page.next());
        page.reset();
        assert_eq!(page.cursor().index(), 0);
    }

    #[test]
    fn final_step_shows_eight_pairs() {
        let mut page = TokenShiftPage::new();
        assert!(page.snapshot().inputs.is_none());
        for _ in 0..3 {
            page.next();
            page.tick();
        }
        let snap = page.snapshot();
        assert_eq!(snap.tokens.len(), 9);
        assert_eq!(snap.tokens[0].id, Some(2940));
        let pairs = snap.pairs.unwrap();
        assert_eq!(pairs.len(), 8);
        assert_eq!(pairs[0].input, "Where");
        assert_eq!(pairs[0].target, " is");
        assert_eq!(pairs[7].target, ".");
        assert_eq!(snap.prompt, "Where is Pune?");
    }
}
