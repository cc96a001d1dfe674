//! `{{ expression }}` template substitution and the boolean condition
//! language layered on top of it.

use crate::context::StepContext;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("static regex"))
}

/// Resolves `{{ ... }}` placeholders against a step context. Non-strict by
/// design: an unresolved path is left as the literal `{{...}}` text
/// rather than erroring, matching the source system's behavior.
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Replaces every `{{ path }}` occurrence in `template` with its
    /// resolved, stringified value.
    pub fn substitute(&self, template: &str, ctx: &StepContext) -> String {
        placeholder_re()
            .replace_all(template, |caps: &regex::Captures| {
                let path = caps[1].trim();
                match self.resolve(path, ctx) {
                    Some(value) => stringify(&value),
                    None => {
                        tracing::debug!(path, "unresolved template expression, left literal");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Resolves an `input_mapping` expression: when `expression` is
    /// exactly one `{{ path }}` placeholder, returns the typed JSON value it
    /// resolves to (so a mapped array/object survives as such). Otherwise
    /// falls back to string substitution, matching `substitute`.
    pub fn resolve_typed(&self, expression: &str, ctx: &StepContext) -> Value {
        let trimmed = expression.trim();
        if let Some(caps) = placeholder_re().captures(trimmed) {
            if caps[0] == *trimmed {
                if let Some(value) = self.resolve(caps[1].trim(), ctx) {
                    return value;
                }
            }
        }
        Value::String(self.substitute(expression, ctx))
    }

    /// Resolves a single dotted path: `input.X...`, `steps.X.output...`,
    /// `execution.id`, `process.name`.
    pub fn resolve(&self, path: &str, ctx: &StepContext) -> Option<Value> {
        let mut parts = path.split('.');
        match parts.next()? {
            "input" => dig(&ctx.input_data, parts),
            "steps" => {
                let step_id = parts.next()?;
                let output_key = parts.next()?;
                if output_key != "output" {
                    return None;
                }
                let output = ctx.step_outputs.get(&pe_domain::StepId::new(step_id))?;
                dig(output, parts)
            }
            "execution" => match parts.next()? {
                "id" => Some(Value::String(ctx.execution_id.to_string())),
                _ => None,
            },
            "process" => match parts.next()? {
                "name" => Some(Value::String(ctx.process_name.clone())),
                "version" => Some(Value::String(ctx.process_version.clone())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn dig<'a>(value: &Value, mut path: impl Iterator<Item = &'a str>) -> Option<Value> {
    let mut current = value.clone();
    for segment in &mut path {
        current = current.as_object()?.get(segment)?.clone();
    }
    Some(current)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extends `ExpressionEvaluator` with boolean comparisons (`==`, `!=`, `<`,
/// `<=`, `>`, `>=`) and logical operators (`and`, `or`, `not`), used for
/// `condition` fields and gateway routes.
pub struct ConditionEvaluator {
    expr: ExpressionEvaluator,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self { expr: ExpressionEvaluator::new() }
    }

    pub fn evaluate(&self, condition: &str, ctx: &StepContext) -> bool {
        self.eval_or(condition.trim(), ctx)
    }

    fn eval_or(&self, expr: &str, ctx: &StepContext) -> bool {
        if let Some((left, right)) = split_top_level(expr, " or ") {
            return self.eval_or(left, ctx) || self.eval_and(right, ctx);
        }
        self.eval_and(expr, ctx)
    }

    fn eval_and(&self, expr: &str, ctx: &StepContext) -> bool {
        if let Some((left, right)) = split_top_level(expr, " and ") {
            return self.eval_and(left, ctx) && self.eval_not(right, ctx);
        }
        self.eval_not(expr, ctx)
    }

    fn eval_not(&self, expr: &str, ctx: &StepContext) -> bool {
        let trimmed = expr.trim();
        if let Some(rest) = trimmed.strip_prefix("not ") {
            return !self.eval_not(rest, ctx);
        }
        self.eval_comparison(trimmed, ctx)
    }

    fn eval_comparison(&self, expr: &str, ctx: &StepContext) -> bool {
        const OPS: &[&str] = &["==", "!=", "<=", ">=", "<", ">"];
        for op in OPS {
            if let Some((lhs, rhs)) = split_once_operator(expr, op) {
                let left = self.eval_operand(lhs.trim(), ctx);
                let right = self.eval_operand(rhs.trim(), ctx);
                return compare(op, &left, &right);
            }
        }
        // No operator: truthy if the resolved/substituted value is non-empty
        // and not the literal "false".
        let value = self.eval_operand(expr.trim(), ctx);
        !matches!(value.trim(), "" | "false")
    }

    fn eval_operand(&self, token: &str, ctx: &StepContext) -> String {
        let unquoted = token.trim_matches(|c| c == '\'' || c == '"');
        if unquoted.len() != token.len() {
            return unquoted.to_string();
        }
        if token.contains("{{") {
            return self.expr.substitute(token, ctx);
        }
        match self.expr.resolve(token, ctx) {
            Some(v) => stringify(&v),
            None => token.to_string(),
        }
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(op: &str, left: &str, right: &str) -> bool {
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return match op {
            "==" => (l - r).abs() < f64::EPSILON,
            "!=" => (l - r).abs() >= f64::EPSILON,
            "<" => l < r,
            "<=" => l <= r,
            ">" => l > r,
            ">=" => l >= r,
            _ => false,
        };
    }
    match op {
        "==" => left == right,
        "!=" => left != right,
        "<" => left < right,
        "<=" => left <= right,
        ">" => left > right,
        ">=" => left >= right,
        _ => false,
    }
}

/// Splits `expr` on the first top-level occurrence of `sep` (outside quotes),
/// returning `(before, after)`.
fn split_top_level<'a>(expr: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    let mut in_quotes = false;
    let mut quote_char = ' ';
    let bytes = expr.as_bytes();
    let sep_bytes = sep.as_bytes();
    let mut i = 0;
    while i + sep_bytes.len() <= bytes.len() {
        let c = bytes[i] as char;
        if in_quotes {
            if c == quote_char {
                in_quotes = false;
            }
        } else if c == '\'' || c == '"' {
            in_quotes = true;
            quote_char = c;
        } else if &expr[i..i + sep_bytes.len()] == sep {
            return Some((&expr[..i], &expr[i + sep_bytes.len()..]));
        }
        i += 1;
    }
    None
}

fn split_once_operator<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    expr.find(op).map(|idx| (&expr[..idx], &expr[idx + op.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_domain::{ExecutionId, StepDefinition};
    use serde_json::json;
    use std::collections::HashMap;

    fn sample_step() -> StepDefinition {
        StepDefinition {
            id: pe_domain::StepId::new("current"),
            name: None,
            config: pe_domain::StepConfig::Timer { duration: None, until: None },
            dependencies: Default::default(),
            condition: None,
            retry_policy: Default::default(),
            error_policy: Default::default(),
            compensation: None,
            roles: None,
            timeout: None,
        }
    }

    fn ctx_with(input: Value, outputs: HashMap<pe_domain::StepId, Value>) -> StepContext {
        StepContext {
            execution_id: ExecutionId::new(),
            process_name: "demo".into(),
            process_version: "1.0".into(),
            step_definition: sample_step(),
            step_outputs: outputs,
            input_data: input,
        }
    }

    #[test]
    fn substitutes_input_path() {
        let ctx = ctx_with(json!({"order_id": "o-1"}), HashMap::new());
        let out = ExpressionEvaluator::new().substitute("order {{input.order_id}}", &ctx);
        assert_eq!(out, "order o-1");
    }

    #[test]
    fn leaves_unresolved_expression_literal() {
        let ctx = ctx_with(json!({}), HashMap::new());
        let out = ExpressionEvaluator::new().substitute("{{input.missing}}", &ctx);
        assert_eq!(out, "{{input.missing}}");
    }

    #[test]
    fn substitutes_prior_step_output() {
        let mut outputs = HashMap::new();
        outputs.insert(pe_domain::StepId::new("research"), json!({"summary": "ok"}));
        let ctx = ctx_with(json!({}), outputs);
        let out = ExpressionEvaluator::new().substitute("{{steps.research.output.summary}}", &ctx);
        assert_eq!(out, "ok");
    }

    #[test]
    fn numeric_comparison_prefers_numeric_compare() {
        let ctx = ctx_with(json!({"score": 7}), HashMap::new());
        assert!(ConditionEvaluator::new().evaluate("{{input.score}} > 5", &ctx));
        assert!(!ConditionEvaluator::new().evaluate("{{input.score}} > 50", &ctx));
    }

    #[test]
    fn logical_and_or_not() {
        let ctx = ctx_with(json!({"a": "1", "b": "0"}), HashMap::new());
        assert!(ConditionEvaluator::new().evaluate("{{input.a}} == 1 and not {{input.b}} == 1", &ctx));
        assert!(ConditionEvaluator::new().evaluate("{{input.a}} == 2 or {{input.b}} == 0", &ctx));
    }

    #[test]
    fn string_comparison_when_not_numeric() {
        let ctx = ctx_with(json!({"status": "approved"}), HashMap::new());
        assert!(ConditionEvaluator::new().evaluate("{{input.status}} == approved", &ctx));
    }
}
