//! Step-by-step walkthrough pages over the `rlhf_viz` formulas.
//!
//! Each page is a self-contained state machine: fixed toy data, a step
//! cursor advanced by `next`, an optional periodic `tick` the host schedules
//! from `tick_interval`, and a serializable snapshot of everything currently
//! on screen. Pages never sleep or spawn; the host owns time.

pub mod active;
pub mod catalog;
pub mod error;
pub mod params;
pub mod stats;
pub mod steps;

pub mod advantage;
pub mod home;
pub mod log_prob;
pub mod padding_masking;
pub mod ppo_training;
pub mod reward_data;
pub mod reward_training;
pub mod token_shift;
pub mod value_model;

pub use active::{ActivePage, PageSettings, PageSnapshot, TextField};
pub use catalog::PageKind;
pub use error::{PageError, Result};
pub use params::ParamSpec;
pub use steps::{StepCursor, StepInfo, StepView};
