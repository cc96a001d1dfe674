//! The `gateway` step handler. Evaluates routes in order and
//! reports which target the engine's scheduler should realize; the handler
//! itself performs no scheduling.

use crate::context::{StepContext, StepHandler, StepResult};
use crate::expr::ConditionEvaluator;
use async_trait::async_trait;
use pe_domain::{ErrorCode, StepConfig, StepType};
use serde_json::json;

pub struct GatewayHandler {
    condition: ConditionEvaluator,
}

impl GatewayHandler {
    pub fn new() -> Self {
        Self { condition: ConditionEvaluator::new() }
    }
}

impl Default for GatewayHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for GatewayHandler {
    fn step_type(&self) -> StepType {
        StepType::Gateway
    }

    async fn execute(&self, ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::Gateway { routes, default_route, .. } = config else {
            return StepResult::fail("gateway handler received a non-gateway config", ErrorCode::InvalidConfig);
        };

        let mut evaluated = Vec::with_capacity(routes.len());
        let mut taken = None;
        for route in routes {
            let matched = self.condition.evaluate(&route.condition, ctx);
            evaluated.push(json!({ "condition": route.condition, "matched": matched, "target": route.target.as_str() }));
            if matched && taken.is_none() {
                taken = Some(route.target.clone());
            }
        }

        let target = taken.or_else(|| default_route.clone());
        match target {
            Some(target) => StepResult::ok(json!({
                "route_taken": target.as_str(),
                "target_step": target.as_str(),
                "conditions": evaluated,
            })),
            None => StepResult::fail(
                "no gateway route matched and no default_route configured",
                ErrorCode::InvalidConfig,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_domain::{ExecutionId, GatewayRoute, GatewayType, StepDefinition, StepId};
    use std::collections::HashMap;

    fn ctx_with_score(score: i64) -> StepContext {
        let config = StepConfig::Gateway {
            routes: vec![
                GatewayRoute { condition: "{{input.score}} > 50".into(), target: StepId::new("high") },
                GatewayRoute { condition: "{{input.score}} > 0".into(), target: StepId::new("low") },
            ],
            gateway_type: GatewayType::Exclusive,
            default_route: Some(StepId::new("fallback")),
        };
        let step = StepDefinition {
            id: StepId::new("route"),
            name: None,
            config,
            dependencies: Default::default(),
            condition: None,
            retry_policy: Default::default(),
            error_policy: Default::default(),
            compensation: None,
            roles: None,
            timeout: None,
        };
        StepContext {
            execution_id: ExecutionId::new(),
            process_name: "p".into(),
            process_version: "1.0".into(),
            step_definition: step,
            step_outputs: HashMap::new(),
            input_data: serde_json::json!({"score": score}),
        }
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let handler = GatewayHandler::new();
        let ctx = ctx_with_score(75);
        let result = handler.execute(&ctx, &ctx.step_definition.config).await;
        match result {
            StepResult::Ok { output, .. } => assert_eq!(output["route_taken"], "high"),
            other => panic!("expected ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn falls_back_to_default_route_when_none_match() {
        let handler = GatewayHandler::new();
        let ctx = ctx_with_score(-5);
        let result = handler.execute(&ctx, &ctx.step_definition.config).await;
        match result {
            StepResult::Ok { output, .. } => assert_eq!(output["route_taken"], "fallback"),
            other => panic!("expected ok, got {other:?}"),
        }
    }
}
