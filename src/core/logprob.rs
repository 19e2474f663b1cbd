//! Softmax and log-probability extraction for teacher-forced targets.

use crate::error::{Result, RlhfError};

/// Numerically stable softmax: the row maximum is subtracted before
/// exponentiating.
///
/// An empty row yields an empty vector. A row with no finite maximum (all
/// `-inf`, or containing NaN/`+inf`) yields a uniform distribution instead
/// of dividing by a zero or non-finite normalizer.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let uniform = || vec![1.0 / logits.len() as f64; logits.len()];
    if !max.is_finite() {
        return uniform();
    }

    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return uniform();
    }

    exps.into_iter().map(|e| e / sum).collect()
}

/// `ln(softmax(logits)[target])`. Underflow to probability 0 gives `-inf`.
pub fn log_prob(logits: &[f64], target: usize) -> Result<f64> {
    let probs = softmax(logits);
    probs
        .get(target)
        .map(|p| p.ln())
        .ok_or(RlhfError::IndexOutOfRange {
            what: "logit row",
            index: target,
            len: logits.len(),
        })
}

/// One log-prob per (row, target) pair.
pub fn sequence_log_probs<R: AsRef<[f64]>>(rows: &[R], targets: &[usize]) -> Result<Vec<f64>> {
    RlhfError::check_len("target indices", rows.len(), targets.len())?;
    rows.iter()
        .zip(targets)
        .map(|(row, &t)| log_prob(row.as_ref(), t))
        .collect()
}

/// Index of the largest logit (first wins on ties).
pub fn argmax(logits: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in logits.iter().enumerate() {
        match best {
            Some((_, b)) if x <= b => {}
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

/// Full breakdown of one prediction, as shown when a token is inspected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenPrediction {
    pub logits: Vec<f64>,
    pub probs: Vec<f64>,
    pub target: usize,
    pub target_prob: f64,
    pub log_prob: f64,
}

impl TokenPrediction {
    pub fn new(logits: &[f64], target: usize) -> Result<Self> {
        if logits.is_empty() {
            return Err(RlhfError::EmptyInput("logit row"));
        }
        let probs = softmax(logits);
        let target_prob = *probs.get(target).ok_or(RlhfError::IndexOutOfRange {
            what: "logit row",
            index: target,
            len: logits.len(),
        })?;
        Ok(Self {
            logits: logits.to_vec(),
            probs,
            target,
            target_prob,
            log_prob: target_prob.ln(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: [f64; 5] = [2.1, 8.5, 1.2, 0.8, 3.2];

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&ROW);
        let sum: f64 = p.iter().sum();
        assert!((sum - 1.0).abs() <= 1e-9, "sum={sum}");
        assert!(p.iter().all(|&x| x > 0.0));
    }

    #[test]
    fn log_prob_is_log_of_target_probability() {
        let p = softmax(&ROW);
        let lp = log_prob(&ROW, 1).unwrap();
        assert_eq!(lp, p[1].ln());
        assert!((lp - (-0.007751397284877211)).abs() < 1e-12);
    }

    #[test]
    fn shift_invariance() {
        let shifted: Vec<f64> = ROW.iter().map(|x| x + 100.0).collect();
        let a = softmax(&ROW);
        let b = softmax(&shifted);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn underflow_gives_negative_infinity() {
        let lp = log_prob(&[0.0, -1.0e4], 1).unwrap();
        assert_eq!(lp, f64::NEG_INFINITY);
    }

    #[test]
    fn degenerate_rows() {
        assert!(softmax(&[]).is_empty());
        let p = softmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(p, vec![0.5, 0.5]);
    }

    #[test]
    fn nan_or_infinite_logits_give_a_uniform_row() {
        let third = 1.0 / 3.0;
        assert_eq!(softmax(&[1.0, f64::NAN, 2.0]), vec![third; 3]);
        assert_eq!(softmax(&[f64::INFINITY, 0.0]), vec![0.5, 0.5]);
        assert!((log_prob(&[1.0, f64::NAN], 0).unwrap() - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_target_is_an_error() {
        let err = log_prob(&ROW, 5).unwrap_err();
        assert_eq!(
            err,
            RlhfError::IndexOutOfRange {
                what: "logit row",
                index: 5,
                len: 5
            }
        );
    }

    #[test]
    fn sequence_log_probs_requires_aligned_targets() {
        let rows = vec![ROW.to_vec(), ROW.to_vec()];
        assert!(sequence_log_probs(&rows, &[1]).is_err());
        let lps = sequence_log_probs(&rows, &[1, 4]).unwrap();
        assert_eq!(lps.len(), 2);
        assert!(lps[0] > lps[1]);
    }

    #[test]
    fn argmax_picks_first_peak() {
        assert_eq!(argmax(&ROW), Some(1));
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn prediction_breakdown() {
        let pred = TokenPrediction::new(&ROW, 1).unwrap();
        assert_eq!(pred.probs.len(), 5);
        assert_eq!(pred.log_prob, pred.target_prob.ln());
        assert!(TokenPrediction::new(&ROW, 9).is_err());
        assert_eq!(TokenPrediction::new(&[], 0), Err(RlhfError::EmptyInput("logit row")));
    }
}
