//! Tunable engine knobs, wired up via `config`/`dotenvy` in `pe-server`;
//! defaults live here so tests and library callers get sane behavior
//! without a config file.

use pe_domain::Money;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Applied to any step that doesn't set its own `timeout`.
    pub default_step_timeout: Duration,
    /// Whether multiple ready steps dispatch concurrently.
    pub parallel_execution: bool,
    /// Concurrency bound on parallel steps within one execution; `0` means
    /// unbounded.
    pub max_concurrent_steps: usize,
    /// When true, a failed step fails the whole execution (and runs
    /// compensation) on the next scheduler iteration.
    pub stop_on_failure: bool,
    /// The deliberate short poll (~100ms) used when running steps are
    /// outstanding but no new ready steps exist.
    pub poll_interval: Duration,
    /// When an execution's running total cost crosses this amount, the
    /// engine raises an `InformedNotification` event. `None` disables the
    /// check.
    pub cost_alert_threshold: Option<Money>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_step_timeout: Duration::from_secs(300),
            parallel_execution: true,
            max_concurrent_steps: 0,
            stop_on_failure: true,
            poll_interval: Duration::from_millis(100),
            cost_alert_threshold: None,
        }
    }
}
