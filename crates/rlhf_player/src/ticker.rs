//! One pending tick at a time, cancellable.
//!
//! Every schedule bumps a generation counter; a tick that was already in
//! flight when it got cancelled carries a stale generation and is dropped by
//! the receiver.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
pub struct Ticker {
    tx: UnboundedSender<u64>,
    generation: u64,
    pending: Option<CancellationToken>,
}

impl Ticker {
    pub fn new(tx: UnboundedSender<u64>) -> Self {
        Self {
            tx,
            generation: 0,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && generation == self.generation
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Replace any pending tick with one firing after `delay`, or with none.
    pub fn reschedule(&mut self, delay: Option<Duration>) {
        self.cancel();
        self.generation += 1;
        let Some(delay) = delay else {
            return;
        };

        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        debug!(generation, delay_ms = delay.as_millis() as u64, "tick scheduled");

        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(generation);
                }
            }
        });
        self.pending = Some(token);
    }

    /// Mark the current tick as delivered.
    pub fn fired(&mut self) {
        self.pending = None;
    }
}
