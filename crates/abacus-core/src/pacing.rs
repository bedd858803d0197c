//! Suspension primitive used to simulate per-operator compute time

use abacus_types::OperatorSymbol;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Charges the simulated cost of one operator node
pub trait Pacer: Send + Sync {
    fn pause(&self, operator: OperatorSymbol, duration: Duration);
}

/// Blocks the calling worker thread for the requested duration
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, _operator: OperatorSymbol, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested pauses without sleeping
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(OperatorSymbol, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order
    pub fn pauses(&self) -> Vec<(OperatorSymbol, Duration)> {
        self.pauses.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sum of all requested pauses
    pub fn total(&self) -> Duration {
        self.pauses().iter().map(|(_, duration)| *duration).sum()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, operator: OperatorSymbol, duration: Duration) {
        self.pauses.lock().unwrap_or_else(PoisonError::into_inner).push((operator, duration));
    }
}
