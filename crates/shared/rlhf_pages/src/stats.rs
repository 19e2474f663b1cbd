use serde::Serialize;

use rlhf_viz::reward_model::PairwiseOutcome;

pub const HISTORY_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub step: u64,
    pub loss: f64,
    pub accuracy: f64,
    pub margin: f64,
}

/// Rolling record of reward-training steps, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub recent: Vec<HistoryPoint>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            recent: Vec::with_capacity(HISTORY_CAP),
        }
    }

    pub fn record(&mut self, step: u64, outcome: &PairwiseOutcome) {
        self.recent.push(HistoryPoint {
            step,
            loss: outcome.loss,
            accuracy: outcome.accuracy,
            margin: outcome.margin,
        });
        if self.recent.len() > HISTORY_CAP {
            self.recent.remove(0);
        }
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.recent.last()
    }

    pub fn accuracy(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        self.recent.iter().map(|p| p.accuracy).sum::<f64>() / self.recent.len() as f64
    }
}
