//! KL-penalized scores and Generalized Advantage Estimation.
//!
//! GAE runs strictly back-to-front over the score vector. The value after
//! the last position is taken as 0 (episode ends at the final token).

use crate::error::{Result, RlhfError};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaeParams {
    pub gamma: f64,
    pub lambda: f64,
}

impl GaeParams {
    /// Both factors must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("gamma", self.gamma), ("lambda", self.lambda)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(RlhfError::InvalidParam {
                    name,
                    reason: format!("{v} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

impl Default for GaeParams {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lambda: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gae {
    pub advantages: Vec<f64>,
    pub returns: Vec<f64>,
}

/// One iteration of the backward recursion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaeStep {
    pub t: usize,
    pub score: f64,
    pub value: f64,
    pub next_value: f64,
    pub delta: f64,
    pub advantage: f64,
    pub ret: f64,
}

/// Per-token KL estimate `policy - reference`.
pub fn kl_divergence(policy: &[f64], reference: &[f64]) -> Result<Vec<f64>> {
    RlhfError::check_len("reference log-probs", policy.len(), reference.len())?;
    Ok(policy.iter().zip(reference).map(|(p, r)| p - r).collect())
}

/// `-beta * kl` for every token, with the scalar reward appended as the
/// terminal score.
pub fn kl_penalized_scores(policy: &[f64], reference: &[f64], beta: f64, reward: f64) -> Result<Vec<f64>> {
    let kl = kl_divergence(policy, reference)?;
    let mut scores: Vec<f64> = kl.iter().map(|k| -beta * k).collect();
    scores.push(reward);
    Ok(scores)
}

/// The recursion in computation order (last position first).
pub fn gae_trace(scores: &[f64], values: &[f64], params: GaeParams) -> Result<Vec<GaeStep>> {
    RlhfError::check_len("values", scores.len(), values.len())?;
    params.validate()?;

    let n = scores.len();
    let mut steps = Vec::with_capacity(n);
    let mut last_gae = 0.0;
    for t in (0..n).rev() {
        let next_value = if t + 1 < n { values[t + 1] } else { 0.0 };
        let delta = scores[t] + params.gamma * next_value - values[t];
        last_gae = delta + params.gamma * params.lambda * last_gae;
        steps.push(GaeStep {
            t,
            score: scores[t],
            value: values[t],
            next_value,
            delta,
            advantage: last_gae,
            ret: last_gae + values[t],
        });
    }
    Ok(steps)
}

pub fn compute_gae(scores: &[f64], values: &[f64], params: GaeParams) -> Result<Gae> {
    let trace = gae_trace(scores, values, params)?;
    let n = trace.len();
    let mut advantages = vec![0.0; n];
    let mut returns = vec![0.0; n];
    for step in trace {
        advantages[step.t] = step.advantage;
        returns[step.t] = step.ret;
    }
    Ok(Gae {
        advantages,
        returns,
    })
}

/// Inputs of the "Where is Pune? Pune is in India." advantage walkthrough.
pub mod demo {
    pub const POLICY_LOG_PROBS: &[f64] = &[-1.2, -0.8, -2.1, -1.5, -0.9, -0.7, -1.8, -1.1];
    pub const REF_LOG_PROBS: &[f64] = &[-1.0, -0.9, -2.0, -1.4, -0.8, -0.8, -1.7, -1.0];
    pub const VALUES: &[f64] = &[0.1, 0.3, 0.6, 0.8, 1.0, 1.2, 1.5, 1.8, 2.0];
    pub const REWARD: f64 = 2.5;
    pub const KL_BETA: f64 = 0.1;
    pub const GAMMA: f64 = 0.99;
    pub const LAMBDA: f64 = 0.95;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() <= tol, "index {i}: {x} vs {y}");
        }
    }

    #[test]
    fn zero_gamma_lambda_is_one_step_delta() {
        let scores = [0.5, -0.2, 1.0];
        let values = [0.3, 0.1, 0.4];
        let gae = compute_gae(&scores, &values, GaeParams { gamma: 0.0, lambda: 0.0 }).unwrap();
        close(&gae.advantages, &[0.2, -0.3, 0.6], 1e-12);
        close(&gae.returns, &scores, 1e-12);
    }

    #[test]
    fn zero_gamma_ignores_lambda() {
        let scores = [0.5, -0.2, 1.0];
        let values = [0.3, 0.1, 0.4];
        let a = compute_gae(&scores, &values, GaeParams { gamma: 0.0, lambda: 0.0 }).unwrap();
        let b = compute_gae(&scores, &values, GaeParams { gamma: 0.0, lambda: 0.9 }).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn where_is_pune_golden_output() {
        let scores = kl_penalized_scores(
            demo::POLICY_LOG_PROBS,
            demo::REF_LOG_PROBS,
            demo::KL_BETA,
            demo::REWARD,
        )
        .unwrap();
        assert_eq!(scores.len(), 9);
        assert_eq!(scores[8], 2.5);

        let gae = compute_gae(
            &scores,
            demo::VALUES,
            GaeParams {
                gamma: demo::GAMMA,
                lambda: demo::LAMBDA,
            },
        )
        .unwrap();

        close(
            &gae.advantages,
            &[
                1.8182793739033862,
                1.7025830663512878,
                1.5083286191932883,
                1.3889724818642086,
                1.2641918999087811,
                1.1336437000625,
                0.912965125,
                0.66025,
                0.5,
            ],
            1e-12,
        );
        close(
            &gae.returns,
            &[
                1.9182793739033863,
                2.0025830663512876,
                2.1083286191932884,
                2.1889724818642087,
                2.264191899908781,
                2.3336437000625,
                2.412965125,
                2.46025,
                2.5,
            ],
            1e-12,
        );
    }

    #[test]
    fn trace_runs_back_to_front() {
        let trace = gae_trace(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0], GaeParams::default()).unwrap();
        let ts: Vec<usize> = trace.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![2, 1, 0]);
        assert_eq!(trace[0].next_value, 0.0);
        assert_eq!(trace[0].advantage, 3.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = compute_gae(&[1.0, 2.0], &[0.0], GaeParams::default()).unwrap_err();
        assert!(matches!(err, RlhfError::LengthMismatch { expected: 2, actual: 1, .. }));
        assert!(kl_divergence(&[1.0], &[]).is_err());
    }

    #[test]
    fn discount_outside_unit_interval_is_rejected() {
        let params = GaeParams {
            gamma: 1.5,
            lambda: 0.95,
        };
        let err = compute_gae(&[1.0], &[0.0], params).unwrap_err();
        assert!(matches!(err, RlhfError::InvalidParam { name: "gamma", .. }));

        let nan = GaeParams {
            gamma: 0.99,
            lambda: f64::NAN,
        };
        assert!(nan.validate().is_err());
        assert!(GaeParams { gamma: 1.0, lambda: 0.0 }.validate().is_ok());
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let gae = compute_gae(&[], &[], GaeParams::default()).unwrap();
        assert!(gae.advantages.is_empty() && gae.returns.is_empty());
    }
}
