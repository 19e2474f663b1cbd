//! Teacher-forced log-probabilities: one logit row per input position,
//! softmax, and the log-probability of the shifted target.

use serde::Serialize;

use rlhf_viz::logprob::{argmax, TokenPrediction};
use rlhf_viz::tokens::{demo, shift_for_next_token};

use crate::error::{PageError, Result};
use crate::steps::{StepCursor, StepInfo, StepView};

pub const STEPS: &[StepInfo] = &[
    StepInfo {
        title: "1. Token Pairs Setup",
        description: "We have input tokens and their corresponding target tokens",
    },
    StepInfo {
        title: "2. Transformer Architecture",
        description: "See how a single token flows through the transformer to produce probabilities",
    },
    StepInfo {
        title: "3. Model Forward Pass",
        description: "For each input token, the model outputs logits (raw scores) for all vocabulary tokens",
    },
    StepInfo {
        title: "4. Softmax & Log Probabilities",
        description: "Convert logits to probabilities and extract log probabilities for target tokens",
    },
];

/// Single-token flow through a decoder block.
pub const ARCHITECTURE: &[StepInfo] = &[
    StepInfo { title: "Token Input", description: "Token 'Where' (ID: 2940) enters the model" },
    StepInfo { title: "Embedding", description: "Convert token ID to dense vector representation" },
    StepInfo { title: "Positional Encoding", description: "Add position information to embedding" },
    StepInfo { title: "Multi-Head Attention", description: "Attend to previous tokens (self-attention)" },
    StepInfo { title: "Add & Norm", description: "Residual connection + layer normalization" },
    StepInfo { title: "Feed Forward", description: "2-layer MLP with non-linear activation" },
    StepInfo { title: "Add & Norm", description: "Another residual connection + normalization" },
    StepInfo { title: "Output Projection", description: "Project to vocabulary size (50k+ dimensions)" },
    StepInfo { title: "Softmax", description: "Convert logits to probability distribution" },
    StepInfo { title: "Log Probability", description: "Take log of target token probability" },
];

/// Labels of the logit columns, followed by words outside the sampled rows.
pub const VOCAB: &[&str] = &["the", "is", "Pune", "?", "in", "India", ".", "a", "of"];

pub const LOGITS: [[f64; 5]; 8] = [
    [2.1, 8.5, 1.2, 0.8, 3.2],
    [1.5, 3.2, 9.1, 2.1, 1.8],
    [0.8, 2.1, 1.9, 7.8, 2.3],
    [3.1, 8.9, 2.4, 1.6, 2.8],
    [1.2, 2.8, 9.4, 1.9, 2.1],
    [2.3, 1.8, 3.1, 8.7, 1.9],
    [1.9, 2.4, 1.1, 2.8, 9.2],
    [8.1, 1.8, 2.3, 1.4, 2.9],
];

/// Vocabulary index of each position's target token.
pub const TARGET_VOCAB: [usize; 8] = [1, 2, 3, 2, 1, 4, 5, 6];

/// Logit column scored for each position. Only five columns are sampled, so
/// the last two targets (" India", ".") are scored at the row's peak column.
pub const TARGET_COLUMNS: [usize; 8] = [1, 2, 3, 2, 1, 4, 4, 0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub position: usize,
    pub input: String,
    pub target: String,
    pub target_column: usize,
    pub target_label: Option<&'static str>,
    pub predicted_column: Option<usize>,
    pub target_prob: f64,
    pub log_prob: f64,
}

/// Full distribution of the selected position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedDetail {
    pub position: usize,
    pub labels: Vec<&'static str>,
    pub prediction: TokenPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogProbSnapshot {
    pub step: StepView,
    pub pairs: Vec<(String, String)>,
    pub show_architecture: bool,
    pub architecture: StepView,
    /// Present from the forward-pass step on.
    pub logits: Option<Vec<Vec<f64>>>,
    /// Present on the final step.
    pub rows: Option<Vec<PredictionRow>>,
    pub sum_log_prob: Option<f64>,
    pub selected: Option<SelectedDetail>,
}

#[derive(Debug, Clone)]
pub struct LogProbPage {
    cursor: StepCursor,
    arch: StepCursor,
    show_architecture: bool,
    selected: Option<usize>,
    logits: Vec<Vec<f64>>,
    targets: Vec<usize>,
    target_labels: Vec<Option<&'static str>>,
}

impl Default for LogProbPage {
    fn default() -> Self {
        Self::new()
    }
}

impl LogProbPage {
    pub fn new() -> Self {
        Self {
            cursor: StepCursor::new(STEPS.len()),
            arch: StepCursor::new(ARCHITECTURE.len()),
            show_architecture: false,
            selected: None,
            logits: LOGITS.iter().map(|r| r.to_vec()).collect(),
            targets: TARGET_COLUMNS.to_vec(),
            target_labels: TARGET_VOCAB.iter().map(|&i| VOCAB.get(i).copied()).collect(),
        }
    }

    /// Replace the demo rows. Every row must have a target; target columns
    /// are checked when the snapshot is built.
    pub fn with_rows(mut self, logits: Vec<Vec<f64>>, targets: Vec<usize>) -> Result<Self> {
        if logits.len() != targets.len() {
            return Err(rlhf_viz::RlhfError::LengthMismatch {
                what: "target columns",
                expected: logits.len(),
                actual: targets.len(),
            }
            .into());
        }
        self.target_labels = targets.iter().map(|&t| VOCAB.get(t).copied()).collect();
        self.logits = logits;
        self.targets = targets;
        self.selected = None;
        Ok(self)
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn architecture_cursor(&self) -> &StepCursor {
        &self.arch
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn next(&mut self) -> bool {
        self.cursor.advance()
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.arch.reset();
        self.show_architecture = false;
        self.selected = None;
    }

    pub fn architecture_next(&mut self) -> bool {
        self.arch.advance()
    }

    pub fn architecture_reset(&mut self) {
        self.arch.reset();
    }

    pub fn toggle_architecture(&mut self) -> bool {
        self.show_architecture = !self.show_architecture;
        self.show_architecture
    }

    /// Selecting the already-selected position clears the selection.
    pub fn select(&mut self, position: Option<usize>) -> Result<Option<usize>> {
        if let Some(p) = position {
            if p >= self.logits.len() {
                return Err(PageError::IndexOutOfRange {
                    what: "token position",
                    index: p,
                    len: self.logits.len(),
                });
            }
        }
        self.selected = match (self.selected, position) {
            (Some(cur), Some(p)) if cur == p => None,
            (_, p) => p,
        };
        Ok(self.selected)
    }

    pub fn predictions(&self) -> Result<Vec<TokenPrediction>> {
        self.logits
            .iter()
            .zip(&self.targets)
            .map(|(row, &t)| TokenPrediction::new(row, t).map_err(PageError::from))
            .collect()
    }

    pub fn snapshot(&self) -> Result<LogProbSnapshot> {
        let (inputs, targets) = shift_for_next_token(demo::COMPLETION);
        let pairs: Vec<(String, String)> = inputs
            .iter()
            .zip(targets)
            .map(|(i, t)| (i.to_string(), t.to_string()))
            .collect();

        let step = self.cursor.index();
        let predictions = self.predictions()?;

        let rows = (step >= 3).then(|| {
            predictions
                .iter()
                .enumerate()
                .map(|(position, p)| {
                    let (input, target) = pairs.get(position).cloned().unwrap_or_default();
                    PredictionRow {
                        position,
                        input,
                        target,
                        target_column: p.target,
                        target_label: self.target_labels.get(position).copied().flatten(),
                        predicted_column: argmax(&p.logits),
                        target_prob: p.target_prob,
                        log_prob: p.log_prob,
                    }
                })
                .collect::<Vec<_>>()
        });
        let sum_log_prob = rows
            .as_ref()
            .map(|rows| rows.iter().map(|r| r.log_prob).sum());

        let selected = self.selected.and_then(|position| {
            predictions.get(position).map(|p| SelectedDetail {
                position,
                labels: VOCAB.iter().take(p.logits.len()).copied().collect(),
                prediction: p.clone(),
            })
        });

        Ok(LogProbSnapshot {
            step: self.cursor.view(STEPS),
            pairs,
            show_architecture: self.show_architecture,
            architecture: self.arch.view(ARCHITECTURE),
            logits: (step >= 2).then(|| self.logits.clone()),
            rows,
            sum_log_prob,
            selected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_log_prob_matches_softmax() {
        let page = LogProbPage::new();
        let preds = page.predictions().unwrap();
        assert_eq!(preds.len(), 8);
        assert!((preds[0].log_prob - -0.007751397284877211).abs() < 1e-12);
        for p in &preds {
            assert!((p.probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        for (position, &vocab) in TARGET_VOCAB.iter().enumerate() {
            let p = &preds[position];
            if vocab < p.logits.len() {
                assert_eq!(p.target, vocab, "position {position}");
            } else {
                assert_eq!(argmax(&p.logits), Some(p.target), "position {position}");
            }
        }
    }

    #[test]
    fn rows_appear_on_final_step() {
        let mut page = LogProbPage::new();
        assert!(page.snapshot().unwrap().rows.is_none());
        while page.next() {}
        assert_eq!(page.cursor().index(), 3);
        let snap = page.snapshot().unwrap();
        let rows = snap.rows.unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].target_label, Some("is"));
        assert_eq!(rows[0].target, " is");
        assert!(snap.sum_log_prob.unwrap() < 0.0);
    }

    #[test]
    fn target_labels_name_the_target_token() {
        let mut page = LogProbPage::new();
        while page.next() {}
        let rows = page.snapshot().unwrap().rows.unwrap();
        for row in &rows {
            assert_eq!(row.target_label, Some(row.target.trim()), "position {}", row.position);
        }
        let columns: Vec<usize> = rows.iter().map(|r| r.target_column).collect();
        assert_eq!(columns, vec![1, 2, 3, 2, 1, 4, 4, 0]);
        assert_eq!(rows[3].target_label, Some("Pune"));
        assert_eq!(rows[4].target_label, Some("is"));
        assert_eq!(rows[5].target_label, Some("in"));
    }

    #[test]
    fn architecture_walkthrough_is_independent() {
        let mut page = LogProbPage::new();
        assert!(page.toggle_architecture());
        for _ in 0..20 {
            page.architecture_next();
        }
        assert_eq!(page.architecture_cursor().index(), 9);
        assert_eq!(page.cursor().index(), 0);
        page.architecture_reset();
        assert_eq!(page.architecture_cursor().index(), 0);

        page.architecture_next();
        page.reset();
        assert_eq!(page.architecture_cursor().index(), 0);
        assert!(!page.snapshot().unwrap().show_architecture);
    }

    #[test]
    fn selection_toggles_and_is_bounded() {
        let mut page = LogProbPage::new();
        assert_eq!(page.select(Some(2)).unwrap(), Some(2));
        let detail = page.snapshot().unwrap().selected.unwrap();
        assert_eq!(detail.labels.len(), 5);
        assert_eq!(detail.prediction.target, 3);
        assert_eq!(page.select(Some(2)).unwrap(), None);
        assert!(page.select(Some(8)).is_err());
        assert_eq!(page.select(None).unwrap(), None);
    }

    #[test]
    fn out_of_row_target_is_an_error() {
        let page = LogProbPage::new()
            .with_rows(vec![vec![0.0, 1.0]], vec![4])
            .unwrap();
        assert!(matches!(
            page.snapshot(),
            Err(PageError::Formula(rlhf_viz::RlhfError::IndexOutOfRange { .. }))
        ));
        assert!(LogProbPage::new().with_rows(vec![vec![0.0]], vec![]).is_err());
    }
}
