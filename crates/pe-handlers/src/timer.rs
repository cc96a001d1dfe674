//! The `timer` step handler. Sleeps for a fixed duration or until a
//! target timestamp, whichever the config specifies, and observes
//! cancellation cooperatively.

use crate::context::{StepContext, StepHandler, StepResult};
use async_trait::async_trait;
use chrono::Utc;
use pe_domain::{ErrorCode, StepConfig, StepType};
use tokio_util::sync::CancellationToken;

pub struct TimerHandler {
    cancellation: CancellationToken,
}

impl TimerHandler {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }
}

#[async_trait]
impl StepHandler for TimerHandler {
    fn step_type(&self) -> StepType {
        StepType::Timer
    }

    async fn execute(&self, _ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::Timer { duration, until } = config else {
            return StepResult::fail("timer handler received a non-timer config", ErrorCode::InvalidConfig);
        };

        let wait_for = match (duration, until) {
            (Some(d), _) => *d,
            (None, Some(target)) => {
                let now = Utc::now();
                if *target <= now {
                    std::time::Duration::ZERO
                } else {
                    (*target - now).to_std().unwrap_or(std::time::Duration::ZERO)
                }
            }
            (None, None) => {
                return StepResult::fail(
                    "timer step requires either duration or until",
                    ErrorCode::InvalidConfig,
                )
            }
        };

        let started = tokio::time::Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(wait_for) => {}
            _ = self.cancellation.cancelled() => {
                return StepResult::fail("timer cancelled", ErrorCode::Internal);
            }
        }

        StepResult::ok(serde_json::json!({ "waited_seconds": started.elapsed().as_secs_f64() }))
    }
}
