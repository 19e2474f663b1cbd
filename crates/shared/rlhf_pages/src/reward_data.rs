//! Pairwise preference dataset construction: tokenize, filter by block
//! size, concatenate prompt with each response, pad and mask.

use serde::Serialize;

use rlhf_viz::padding::Padded;
use rlhf_viz::reward_model::RewardPair;
use rlhf_viz::tokenizer::{toy_token_id, tokenize, VocabEntry, Vocabulary};

use crate::catalog::PageKind;
use crate::error::{PageError, Result};
use crate::params::{self, ParamSpec, REWARD_DATA_PARAMS};
use crate::steps::{StepCursor, StepInfo, StepView};

pub const DEFAULT_PROMPT: &str =
    "Summarize the following article in one sentence: Pune is a vibrant city in India, known for education and culture.";
pub const DEFAULT_CHOSEN: &str = "Pune is a major Indian city celebrated for its education and culture.";
pub const DEFAULT_REJECTED: &str =
    "Pune is somewhere; I don't know much about it, maybe a place with something happening.";

pub const STEPS: &[StepInfo] = &[StepInfo {
    title: "Pairwise dataset",
    description: "Filter long pairs, concatenate prompt with each response, pad with EOT and mask",
}];

/// Editable text inputs of the reward pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Prompt,
    Chosen,
    Rejected,
}

impl TextField {
    pub fn parse(name: &str) -> Option<TextField> {
        match name {
            "prompt" => Some(TextField::Prompt),
            "chosen" => Some(TextField::Chosen),
            "rejected" => Some(TextField::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextToken {
    pub text: String,
    pub id: u32,
}

pub(crate) fn text_tokens(text: &str) -> Vec<TextToken> {
    tokenize(text)
        .into_iter()
        .map(|t| {
            let id = toy_token_id(&t);
            TextToken { text: t, id }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedView {
    pub concat: Vec<u32>,
    pub padded: Padded,
    pub active: usize,
    pub response_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardDataSnapshot {
    pub step: StepView,
    pub block_size: usize,
    pub prompt: Vec<TextToken>,
    pub chosen: Vec<TextToken>,
    pub rejected: Vec<TextToken>,
    pub keep: bool,
    pub positive: PackedView,
    pub negative: PackedView,
    pub vocabulary: Vec<VocabEntry>,
}

#[derive(Debug, Clone)]
pub struct RewardDataPage {
    cursor: StepCursor,
    prompt: String,
    chosen: String,
    rejected: String,
    block_size: usize,
}

impl Default for RewardDataPage {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardDataPage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            prompt: DEFAULT_PROMPT.to_string(),
            chosen: DEFAULT_CHOSEN.to_string(),
            rejected: DEFAULT_REJECTED.to_string(),
            block_size: params::REWARD_DATA_BLOCK_SIZE.default as usize,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        REWARD_DATA_PARAMS
    }

    pub fn set_param(&mut self, key: &str, value: f64) -> Result<f64> {
        let spec = params::find(REWARD_DATA_PARAMS, key)
            .ok_or_else(|| PageError::unknown_param(PageKind::RewardData, key))?;
        let v = spec.clamp(value);
        self.block_size = v as usize;
        Ok(v)
    }

    pub fn set_text(&mut self, field: TextField, text: impl Into<String>) {
        let text = text.into();
        match field {
            TextField::Prompt => self.prompt = text,
            TextField::Chosen => self.chosen = text,
            TextField::Rejected => self.rejected = text,
        }
    }

    /// Restore the default texts and block size.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn pair(&self) -> RewardPair {
        RewardPair::build(&self.prompt, &self.chosen, &self.rejected, self.block_size)
    }

    pub fn snapshot(&self) -> RewardDataSnapshot {
        let pair = self.pair();
        let view = |side: rlhf_viz::reward_model::PackedSide| PackedView {
            active: side.padded.active_count(),
            concat: side.concat,
            padded: side.padded,
            response_len: side.response_len,
        };
        let vocabulary = Vocabulary::from_texts([
            self.prompt.as_str(),
            self.chosen.as_str(),
            self.rejected.as_str(),
        ]);

        RewardDataSnapshot {
            step: self.cursor.view(STEPS),
            block_size: self.block_size,
            prompt: text_tokens(&self.prompt),
            chosen: text_tokens(&self.chosen),
            rejected: text_tokens(&self.rejected),
            keep: pair.kept,
            positive: view(pair.chosen),
            negative: view(pair.rejected),
            vocabulary: vocabulary.entries().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlhf_viz::padding::EOT_ID;

    #[test]
    fn default_pair_fits_block_32() {
        let page = RewardDataPage::new();
        let snap = page.snapshot();
        assert_eq!(snap.block_size, 32);
        assert_eq!(
            snap.keep,
            snap.prompt.len() + snap.chosen.len() <= 33 && snap.prompt.len() + snap.rejected.len() <= 33
        );
        assert_eq!(snap.positive.padded.ids.len(), 32);
        assert_eq!(snap.positive.padded.mask.len(), 32);
        assert_eq!(snap.positive.concat.len(), snap.prompt.len() + snap.chosen.len());
        assert!(!snap.vocabulary.is_empty());
    }

    #[test]
    fn short_texts_are_padded_with_eot() {
        let mut page = RewardDataPage::new();
        page.set_text(TextField::Prompt, "Hi");
        page.set_text(TextField::Chosen, "Hello there.");
        page.set_text(TextField::Rejected, "No");
        page.set_param("block_size", 8.0).unwrap();

        let snap = page.snapshot();
        assert!(snap.keep);
        // "Hi" + "Hello" "there" "." = 4 ids, so positions 0..=4 stay active.
        assert_eq!(snap.positive.concat.len(), 4);
        assert_eq!(snap.positive.active, 5);
        assert_eq!(snap.positive.padded.ids[4], EOT_ID);
        assert_eq!(snap.negative.active, 3);
    }

    #[test]
    fn block_size_is_clamped_and_drops_long_pairs() {
        let mut page = RewardDataPage::new();
        assert_eq!(page.set_param("block_size", 2.0).unwrap(), 8.0);
        let snap = page.snapshot();
        assert!(!snap.keep);
        assert!(snap.positive.padded.truncated);
        assert!(snap.positive.padded.mask.iter().all(|&m| !m));

        assert!(page.set_param("lr", 0.1).is_err());
        page.reset();
        assert_eq!(page.block_size(), 32);
    }
}
