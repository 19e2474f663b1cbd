//! Toy pairwise reward model.
//!
//! Hash-seeded pseudo-embeddings are mean-pooled up to the last active
//! position, scored by a linear head, and trained with the Bradley–Terry
//! loss `L = -log σ(r_chosen - r_rejected)` using plain gradient descent.
//! Only the head weights learn; the bias stays where it was set.

use crate::error::{Result, RlhfError};
use crate::head::LinearHead;
use crate::padding::{keep_pair, pad_tokens, Padded, EOT_ID};
use crate::tokenizer::encode;

pub const EMBED_DIM: usize = 8;

/// Deterministic embedding in `[-1, 1]^dim`, drawn from an xorshift32
/// stream seeded by the token id.
pub fn toy_embedding(id: u32, dim: usize) -> Vec<f64> {
    let mut x = id;
    (0..dim)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            let u = f64::from(x) / f64::from(u32::MAX);
            u * 2.0 - 1.0
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pooled {
    /// Last position included in the mean; `None` for an empty sequence.
    pub last_index: Option<usize>,
    pub rep: Vec<f64>,
}

/// Mean-pool embeddings over `0..=last_active`. If every position is
/// masked, the final position is used.
pub fn pool(ids: &[u32], mask: &[bool], dim: usize) -> Result<Pooled> {
    RlhfError::check_len("mask", ids.len(), mask.len())?;

    let last_index = mask
        .iter()
        .rposition(|&m| !m)
        .or_else(|| ids.len().checked_sub(1));

    let mut rep = vec![0.0; dim];
    if let Some(last) = last_index {
        for &id in &ids[..=last] {
            for (acc, e) in rep.iter_mut().zip(toy_embedding(id, dim)) {
                *acc += e;
            }
        }
        let count = (last + 1) as f64;
        rep.iter_mut().for_each(|v| *v /= count);
    }
    Ok(Pooled { last_index, rep })
}

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `log σ(x)`, stable for large `|x|`.
pub fn log_sigmoid(x: f64) -> f64 {
    -softplus(-x)
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// One side of a preference pair after tokenize → concat → pad/mask.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedSide {
    pub concat: Vec<u32>,
    pub padded: Padded,
    pub response_len: usize,
}

impl PackedSide {
    fn build(prompt_ids: &[u32], response: &str, block_size: usize) -> Self {
        let response_ids = encode(response);
        let mut concat = prompt_ids.to_vec();
        concat.extend_from_slice(&response_ids);
        let padded = pad_tokens(&concat, block_size, EOT_ID);
        Self {
            concat,
            padded,
            response_len: response_ids.len(),
        }
    }

    pub fn pooled(&self, dim: usize) -> Result<Pooled> {
        pool(&self.padded.ids, &self.padded.mask, dim)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardPair {
    pub block_size: usize,
    pub prompt_ids: Vec<u32>,
    pub chosen: PackedSide,
    pub rejected: PackedSide,
    /// Result of the dataset length filter.
    pub kept: bool,
}

impl RewardPair {
    pub fn build(prompt: &str, chosen: &str, rejected: &str, block_size: usize) -> Self {
        let prompt_ids = encode(prompt);
        let chosen = PackedSide::build(&prompt_ids, chosen, block_size);
        let rejected = PackedSide::build(&prompt_ids, rejected, block_size);
        let kept = keep_pair(
            prompt_ids.len(),
            chosen.response_len,
            rejected.response_len,
            block_size,
        );
        Self {
            block_size,
            prompt_ids,
            chosen,
            rejected,
            kept,
        }
    }

    pub fn prompt_len(&self) -> usize {
        self.prompt_ids.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairwiseOutcome {
    pub chosen_reward: f64,
    pub rejected_reward: f64,
    pub margin: f64,
    pub loss: f64,
    /// 1 iff the margin is strictly positive.
    pub accuracy: f64,
}

impl PairwiseOutcome {
    pub fn from_rewards(chosen_reward: f64, rejected_reward: f64) -> Self {
        let margin = chosen_reward - rejected_reward;
        Self {
            chosen_reward,
            rejected_reward,
            margin,
            loss: -log_sigmoid(margin),
            accuracy: if margin > 0.0 { 1.0 } else { 0.0 },
        }
    }
}

/// `∂L/∂w = (σ(Δ) - 1) · (pooled_chosen - pooled_rejected)`.
pub fn pairwise_gradient(margin: f64, chosen: &[f64], rejected: &[f64]) -> Result<Vec<f64>> {
    RlhfError::check_len("rejected features", chosen.len(), rejected.len())?;
    let g = sigmoid(margin) - 1.0;
    Ok(chosen.iter().zip(rejected).map(|(c, r)| g * (c - r)).collect())
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardTrainer {
    pub head: LinearHead,
    pub lr: f64,
    pub steps: u64,
}

impl RewardTrainer {
    pub fn new(dim: usize, lr: f64) -> Self {
        Self {
            head: LinearHead::zeros(dim),
            lr,
            steps: 0,
        }
    }

    pub fn evaluate(&self, chosen: &[f64], rejected: &[f64]) -> Result<PairwiseOutcome> {
        let rc = self.head.forward(chosen)?;
        let rr = self.head.forward(rejected)?;
        Ok(PairwiseOutcome::from_rewards(rc, rr))
    }

    /// One gradient-descent step. Returns the outcome measured *before* the
    /// update.
    pub fn step(&mut self, chosen: &[f64], rejected: &[f64]) -> Result<PairwiseOutcome> {
        let outcome = self.evaluate(chosen, rejected)?;
        let grad = pairwise_gradient(outcome.margin, chosen, rejected)?;
        self.head.apply_gradient(&grad, self.lr)?;
        self.steps += 1;
        Ok(outcome)
    }

    /// Zero the weights and the step count; the learning rate is kept.
    pub fn reset(&mut self) {
        self.head.reset();
        self.steps = 0;
    }
}

/// Default texts of the reward pages.
pub mod demo {
    pub const PROMPT: &str = "Summarize: Pune is a vibrant Indian city known for education and culture.";
    pub const CHOSEN: &str = "Pune is an Indian city celebrated for education and culture.";
    pub const REJECTED: &str = "Pune might be somewhere; the details are unclear and repetitive.";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic_and_bounded() {
        let a = toy_embedding(24723, EMBED_DIM);
        assert_eq!(a, toy_embedding(24723, EMBED_DIM));
        assert_eq!(a.len(), EMBED_DIM);
        assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_ne!(a, toy_embedding(318, EMBED_DIM));
    }

    #[test]
    fn pooling_stops_at_last_active_position() {
        let ids = [10, 20, 30, EOT_ID];
        let mask = [false, false, true, true];
        let pooled = pool(&ids, &mask, 4).unwrap();
        assert_eq!(pooled.last_index, Some(1));

        let a = toy_embedding(10, 4);
        let b = toy_embedding(20, 4);
        for i in 0..4 {
            assert!((pooled.rep[i] - (a[i] + b[i]) / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn fully_masked_falls_back_to_final_position() {
        let pooled = pool(&[1, 2], &[true, true], 3).unwrap();
        assert_eq!(pooled.last_index, Some(1));
        let empty = pool(&[], &[], 3).unwrap();
        assert_eq!(empty.last_index, None);
        assert_eq!(empty.rep, vec![0.0; 3]);
        assert!(pool(&[1], &[], 3).is_err());
    }

    #[test]
    fn zero_margin_loss_is_ln2_and_not_accurate() {
        let o = PairwiseOutcome::from_rewards(0.3, 0.3);
        assert_eq!(o.margin, 0.0);
        assert!((o.loss - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(o.accuracy, 0.0);
        assert_eq!(PairwiseOutcome::from_rewards(0.4, 0.3).accuracy, 1.0);
    }

    #[test]
    fn sigmoid_helpers_are_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(log_sigmoid(-800.0).is_finite());
        assert!((log_sigmoid(2.0) - sigmoid(2.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn gradient_formula() {
        let g = pairwise_gradient(0.0, &[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_eq!(g, vec![-0.5, 0.5]);
    }

    #[test]
    fn pair_build_applies_filter_and_padding() {
        let pair = RewardPair::build(demo::PROMPT, demo::CHOSEN, demo::REJECTED, 48);
        assert!(pair.kept);
        assert_eq!(pair.chosen.padded.ids.len(), 48);
        assert_eq!(pair.rejected.padded.mask.len(), 48);
        assert_eq!(pair.chosen.concat.len(), pair.prompt_len() + pair.chosen.response_len);

        let tight = RewardPair::build(demo::PROMPT, demo::CHOSEN, demo::REJECTED, 16);
        assert!(!tight.kept);
        assert!(tight.chosen.padded.truncated);
    }

    #[test]
    fn training_reduces_loss_on_default_texts() {
        let pair = RewardPair::build(demo::PROMPT, demo::CHOSEN, demo::REJECTED, 48);
        let c = pair.chosen.pooled(EMBED_DIM).unwrap().rep;
        let r = pair.rejected.pooled(EMBED_DIM).unwrap().rep;
        assert!(c.iter().zip(&r).any(|(a, b)| (a - b).abs() > 1e-9));

        let mut trainer = RewardTrainer::new(EMBED_DIM, 0.5);
        let first = trainer.step(&c, &r).unwrap();
        assert!((first.loss - std::f64::consts::LN_2).abs() < 1e-12);

        let mut last = first.loss;
        for _ in 0..20 {
            let o = trainer.step(&c, &r).unwrap();
            assert!(o.loss < last);
            last = o.loss;
        }
        assert_eq!(trainer.steps, 21);
        assert_eq!(trainer.evaluate(&c, &r).unwrap().accuracy, 1.0);

        trainer.reset();
        assert_eq!(trainer.steps, 0);
        assert!(trainer.head.weights.iter().all(|&w| w == 0.0));
    }
}
