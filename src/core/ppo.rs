//! Per-token PPO objective, value loss and mini-batch bookkeeping.

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PpoHyperparams {
    pub clip_eps: f64,
    pub value_coef: f64,
    pub entropy_coef: f64,
    pub use_value_clip: bool,
    pub value_clip_range: f64,
}

impl Default for PpoHyperparams {
    fn default() -> Self {
        Self {
            clip_eps: 0.2,
            value_coef: 0.5,
            entropy_coef: 0.01,
            use_value_clip: true,
            value_clip_range: 0.2,
        }
    }
}

/// Everything the loss needs for one generated token.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenLossInput {
    pub old_log_prob: f64,
    pub new_log_prob: f64,
    pub advantage: f64,
    pub ret: f64,
    /// Current value prediction `V`.
    pub value: f64,
    /// Old value prediction the clipped value is anchored to.
    pub target_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenLoss {
    pub ratio: f64,
    pub unclipped: f64,
    pub clipped: f64,
    pub ppo_loss: f64,
    pub value_loss: f64,
    /// `-new_log_prob`: a one-sample stand-in for the policy entropy.
    pub entropy: f64,
    pub total: f64,
}

pub fn clip(x: f64, low: f64, high: f64) -> f64 {
    x.min(high).max(low)
}

/// `(ratio·A, clip(ratio, 1±ε)·A, -min(...))`.
pub fn clipped_objective(ratio: f64, advantage: f64, clip_eps: f64) -> (f64, f64, f64) {
    let unclipped = ratio * advantage;
    let clipped = clip(ratio, 1.0 - clip_eps, 1.0 + clip_eps) * advantage;
    (unclipped, clipped, -unclipped.min(clipped))
}

/// Squared error, or the pessimistic max with the clipped prediction when
/// value clipping is on and an anchor is available.
pub fn value_loss(value: f64, ret: f64, target_value: Option<f64>, hp: &PpoHyperparams) -> f64 {
    let plain = (value - ret).powi(2);
    match target_value {
        Some(anchor) if hp.use_value_clip => {
            let v_clipped = clip(value, anchor - hp.value_clip_range, anchor + hp.value_clip_range);
            plain.max((v_clipped - ret).powi(2))
        }
        _ => plain,
    }
}

pub fn token_loss(input: &TokenLossInput, hp: &PpoHyperparams) -> TokenLoss {
    let ratio = (input.new_log_prob - input.old_log_prob).exp();
    let (unclipped, clipped, ppo_loss) = clipped_objective(ratio, input.advantage, hp.clip_eps);
    let value_loss = value_loss(input.value, input.ret, input.target_value, hp);
    let entropy = -input.new_log_prob;
    TokenLoss {
        ratio,
        unclipped,
        clipped,
        ppo_loss,
        value_loss,
        entropy,
        total: ppo_loss + hp.value_coef * value_loss - hp.entropy_coef * entropy,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LossTotals {
    pub ppo: f64,
    pub value: f64,
    pub entropy: f64,
    pub total: f64,
    pub tokens: usize,
}

impl LossTotals {
    pub fn add(&mut self, loss: &TokenLoss) {
        self.ppo += loss.ppo_loss;
        self.value += loss.value_loss;
        self.entropy += loss.entropy;
        self.total += loss.total;
        self.tokens += 1;
    }

    pub fn mean_total(&self) -> f64 {
        if self.tokens == 0 {
            0.0
        } else {
            self.total / self.tokens as f64
        }
    }
}

impl<'a> FromIterator<&'a TokenLoss> for LossTotals {
    fn from_iter<I: IntoIterator<Item = &'a TokenLoss>>(iter: I) -> Self {
        let mut totals = LossTotals::default();
        for loss in iter {
            totals.add(loss);
        }
        totals
    }
}

pub fn num_minibatches(batch_size: usize, minibatch_size: usize) -> usize {
    if minibatch_size == 0 {
        return 0;
    }
    batch_size.div_ceil(minibatch_size)
}

/// Slice of `permutation` covered by mini-batch `index` (empty past the end).
pub fn minibatch(permutation: &[usize], index: usize, minibatch_size: usize) -> &[usize] {
    let start = index.saturating_mul(minibatch_size);
    if start >= permutation.len() {
        return &[];
    }
    let end = (start + minibatch_size).min(permutation.len());
    &permutation[start..end]
}
