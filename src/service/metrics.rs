//! Operation counters and smoothed latencies.
//!
//! Counters are atomics so a shared service can be driven from many tasks.
//! Callers only ever see [`MetricsSnapshot`] copies.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    KeypairGeneration,
    Encapsulation,
    Decapsulation,
}

#[derive(Debug, Default, Clone, Copy)]
struct LatencyAverages {
    keypair_ms: Option<f64>,
    encapsulation_ms: Option<f64>,
    decapsulation_ms: Option<f64>,
}

impl LatencyAverages {
    fn slot(&mut self, op: Operation) -> &mut Option<f64> {
        match op {
            Operation::KeypairGeneration => &mut self.keypair_ms,
            Operation::Encapsulation => &mut self.encapsulation_ms,
            Operation::Decapsulation => &mut self.decapsulation_ms,
        }
    }
}

pub struct Metrics {
    keypair_generations: AtomicU64,
    encapsulations: AtomicU64,
    decapsulations: AtomicU64,
    errors: AtomicU64,
    fallback_activations: AtomicU64,
    classical_only_operations: AtomicU64,
    latencies: Mutex<LatencyAverages>,
    smoothing: f64,
}

/// Point-in-time copy of the service metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub keypair_generations: u64,
    pub encapsulations: u64,
    pub decapsulations: u64,
    pub errors: u64,
    /// Initializations that ended in classical-only mode
    pub fallback_activations: u64,
    /// Successful operations performed without the PQ leg
    pub classical_only_operations: u64,
    pub avg_keypair_ms: f64,
    pub avg_encapsulation_ms: f64,
    pub avg_decapsulation_ms: f64,
    /// errors / (successful operations + errors), in percent
    pub error_rate_percent: f64,
    /// classical-only operations / successful operations, in percent
    pub fallback_usage_percent: f64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl Metrics {
    pub fn new(smoothing: f64) -> Self {
        Self {
            keypair_generations: AtomicU64::new(0),
            encapsulations: AtomicU64::new(0),
            decapsulations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            fallback_activations: AtomicU64::new(0),
            classical_only_operations: AtomicU64::new(0),
            latencies: Mutex::new(LatencyAverages::default()),
            smoothing,
        }
    }

    fn counter(&self, op: Operation) -> &AtomicU64 {
        match op {
            Operation::KeypairGeneration => &self.keypair_generations,
            Operation::Encapsulation => &self.encapsulations,
            Operation::Decapsulation => &self.decapsulations,
        }
    }

    pub fn record_success(&self, op: Operation, classical_only: bool, elapsed: Duration) {
        self.counter(op).fetch_add(1, Ordering::Relaxed);
        if classical_only {
            self.classical_only_operations.fetch_add(1, Ordering::Relaxed);
        }

        let sample = elapsed.as_secs_f64() * 1000.0;
        let mut latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        let slot = latencies.slot(op);
        *slot = Some(match *slot {
            None => sample,
            Some(avg) => avg + self.smoothing * (sample - avg),
        });
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_activation(&self) {
        self.fallback_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let keypair_generations = self.keypair_generations.load(Ordering::Relaxed);
        let encapsulations = self.encapsulations.load(Ordering::Relaxed);
        let decapsulations = self.decapsulations.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let fallback_activations = self.fallback_activations.load(Ordering::Relaxed);
        let classical_only_operations = self.classical_only_operations.load(Ordering::Relaxed);
        let latencies = *self.latencies.lock().unwrap_or_else(|e| e.into_inner());

        let successes = keypair_generations + encapsulations + decapsulations;

        MetricsSnapshot {
            keypair_generations,
            encapsulations,
            decapsulations,
            errors,
            fallback_activations,
            classical_only_operations,
            avg_keypair_ms: latencies.keypair_ms.unwrap_or(0.0),
            avg_encapsulation_ms: latencies.encapsulation_ms.unwrap_or(0.0),
            avg_decapsulation_ms: latencies.decapsulation_ms.unwrap_or(0.0),
            error_rate_percent: percent(errors, successes + errors),
            fallback_usage_percent: percent(classical_only_operations, successes),
        }
    }

    pub fn reset(&self) {
        self.keypair_generations.store(0, Ordering::Relaxed);
        self.encapsulations.store(0, Ordering::Relaxed);
        self.decapsulations.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.fallback_activations.store(0, Ordering::Relaxed);
        self.classical_only_operations.store(0, Ordering::Relaxed);
        *self.latencies.lock().unwrap_or_else(|e| e.into_inner()) = LatencyAverages::default();
    }
}
