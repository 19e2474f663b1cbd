//! # rlhf_viz
//!
//! The arithmetic behind RLHF, small enough to follow by hand.
//!
//! Every function here works on tiny fixed-size arrays (a handful of tokens,
//! a block of at most 128 ids) and mirrors one step of a PPO-based RLHF
//! pipeline: next-token shifting, log-probabilities, KL-penalized scores,
//! GAE, padding and masking, a toy pairwise reward model and the clipped
//! PPO objective.
//!
//! ## Quick Start
//!
//! ```
//! use rlhf_viz::prelude::*;
//!
//! let scores = kl_penalized_scores(&[-1.2, -0.8], &[-1.0, -0.9], 0.1, 2.5).unwrap();
//! let gae = compute_gae(&scores, &[0.1, 0.3, 0.6], GaeParams::default()).unwrap();
//! assert_eq!(gae.advantages.len(), 3);
//!
//! let padded = pad_tokens(&[11, 12, 13], 6, EOT_ID);
//! assert_eq!(padded.mask, vec![false, false, false, false, true, true]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialize/Deserialize on result and parameter types
//!
//! ## Modules
//!
//! - [`tokens`]: tokens, annotated sequences, next-token shift
//! - [`tokenizer`]: whitespace/punctuation toy tokenizer with hashed ids
//! - [`logprob`]: stable softmax and target log-probs
//! - [`gae`]: KL-penalized scores and Generalized Advantage Estimation
//! - [`padding`]: block-size padding, truncation, masks and the pair filter
//! - [`head`]: scalar linear head shared by value and reward models
//! - [`reward_model`]: pooled toy embeddings and the pairwise loss
//! - [`ppo`]: clipped objective, value loss, mini-batch slicing
//! - [`prng`]: seeded generator for synthetic data

#[path = "core/error.rs"]
pub mod error;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/tokens.rs"]
pub mod tokens;

#[path = "core/tokenizer.rs"]
pub mod tokenizer;

#[path = "core/logprob.rs"]
pub mod logprob;

#[path = "core/gae.rs"]
pub mod gae;

#[path = "core/padding.rs"]
pub mod padding;

#[path = "core/head.rs"]
pub mod head;

#[path = "core/reward_model.rs"]
pub mod reward_model;

#[path = "core/ppo.rs"]
pub mod ppo;

pub use error::{Result, RlhfError};

/// Prelude module for convenient imports.
///
/// ```
/// use rlhf_viz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Result, RlhfError};
    pub use crate::gae::{compute_gae, gae_trace, kl_divergence, kl_penalized_scores, Gae, GaeParams, GaeStep};
    pub use crate::head::LinearHead;
    pub use crate::logprob::{log_prob, sequence_log_probs, softmax, TokenPrediction};
    pub use crate::padding::{action_mask, fits_block, keep_pair, pad_tokens, pad_values, Padded, EOT_ID};
    pub use crate::ppo::{token_loss, LossTotals, PpoHyperparams, TokenLoss, TokenLossInput};
    pub use crate::prng::Prng;
    pub use crate::reward_model::{PairwiseOutcome, RewardPair, RewardTrainer, EMBED_DIM};
    pub use crate::tokenizer::{encode, tokenize};
    pub use crate::tokens::{shift_for_next_token, Sequence, Token, TokenRole};
}
