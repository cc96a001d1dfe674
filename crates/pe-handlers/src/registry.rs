//! Maps a `StepType` to its `StepHandler` implementation. Assembled
//! once at startup from the individual handlers and threaded through the
//! engine as part of its `EngineContext` (no process-wide singleton).

use crate::context::StepHandler;
use pe_domain::StepType;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> &mut Self {
        self.handlers.insert(handler.step_type(), handler);
        self
    }

    pub fn get(&self, step_type: StepType) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&step_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{StepContext, StepResult};
    use async_trait::async_trait;

    struct StubHandler(StepType);

    #[async_trait]
    impl StepHandler for StubHandler {
        fn step_type(&self) -> StepType {
            self.0
        }

        async fn execute(&self, _ctx: &StepContext, _config: &pe_domain::StepConfig) -> StepResult {
            StepResult::ok(serde_json::json!({}))
        }
    }

    #[test]
    fn registers_and_retrieves_by_step_type() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(StubHandler(StepType::Timer)));
        assert!(registry.get(StepType::Timer).is_some());
        assert!(registry.get(StepType::Gateway).is_none());
    }
}
