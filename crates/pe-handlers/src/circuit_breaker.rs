//! A small circuit breaker wrapping calls to the external `AgentGateway`.
//! Mirrors the shape of a unified circuit-breaker-behavior contract: a
//! pre-flight gate (`should_allow`), success/failure recording, and a
//! metrics snapshot for observability — scaled down to what the agent-task
//! handler needs.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u32,
    pub state: CircuitState,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    total_calls: u64,
    success_count: u64,
    failure_count: u64,
    opened_at: Option<Instant>,
}

/// Trips open after `failure_threshold` consecutive failures; after
/// `recovery_timeout` elapses it allows one probing call (half-open). A
/// success in half-open closes the circuit; a failure re-opens it.
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                total_calls: 0,
                success_count: 0,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn should_allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        inner.success_count += 1;
        inner.consecutive_failures = 0;
        if inner.state != CircuitState::Closed {
            tracing::info!(circuit_breaker = %self.name, "circuit breaker closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        inner.failure_count += 1;
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(circuit_breaker = %self.name, failures = inner.consecutive_failures, "circuit breaker opened");
            }
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            total_calls: inner.total_calls,
            success_count: inner.success_count,
            failure_count: inner.failure_count,
            consecutive_failures: inner.consecutive_failures,
            state: inner.state,
        }
    }
}
