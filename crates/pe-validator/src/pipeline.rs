//! The five-stage validation pipeline: syntax, schema, parse-to-aggregate,
//! semantic invariants, warnings. Each stage accumulates path-qualified
//! `ValidationIssue`s; a stage only runs once the previous one produced zero
//! errors.

use chrono::Utc;
use pe_domain::definition::{
    Compensation, DefinitionStatus, ErrorAction, ErrorPolicy, GatewayRoute, GatewayType,
    NotificationChannel, Output, ProcessDefinition, Roles, RetryPolicy, StepConfig,
    StepDefinition, StepType, Trigger, Version,
};
use pe_domain::duration::parse_duration;
use pe_domain::schedule::validate_cron;
use pe_domain::{DefinitionId, StepId, ValidationIssue};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration as StdDuration;

/// Result of `validate`: a pure function of the raw document.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub definition: Option<ProcessDefinition>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collaborator queried during the warnings stage. Never
/// blocks validation; a `false` result only produces a warning.
pub trait AgentAvailability {
    fn is_known(&self, agent: &str) -> bool;
}

/// Collaborator for the `sub_process` warning: whether a published
/// definition with this name (and optional version) exists.
pub trait SubProcessLookup {
    fn is_published(&self, process_name: &str, version: Option<&str>) -> bool;
}

fn process_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("static regex"))
}

fn step_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("static regex"))
}

/// Validates a raw declarative document with no warning-stage collaborators.
/// Suitable for offline linting, e.g. in an editor, where agent/sub-process
/// existence cannot be checked.
pub fn validate(raw: &str, created_by: &str) -> ValidationResult {
    validate_with_context(raw, created_by, None, None)
}

/// Full pipeline, optionally checking agent and sub-process availability in
/// the warnings stage.
pub fn validate_with_context(
    raw: &str,
    created_by: &str,
    agents: Option<&dyn AgentAvailability>,
    sub_processes: Option<&dyn SubProcessLookup>,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Stage 1: syntax.
    let doc: Value = match serde_yaml::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "process definition failed syntax stage");
            errors.push(ValidationIssue::new("$", format!("malformed document: {e}")));
            return ValidationResult { errors, warnings, definition: None };
        }
    };

    let Some(root) = doc.as_object() else {
        errors.push(ValidationIssue::new("$", "document must be a mapping at the top level"));
        return ValidationResult { errors, warnings, definition: None };
    };

    // Stage 2: schema.
    check_schema(root, &mut errors);
    if !errors.is_empty() {
        return ValidationResult { errors, warnings, definition: None };
    }

    // Stage 3: parse to aggregate.
    let Some(definition) = parse_aggregate(root, created_by, &mut errors) else {
        return ValidationResult { errors, warnings, definition: None };
    };
    if !errors.is_empty() {
        return ValidationResult { errors, warnings, definition: None };
    }

    // Stage 4: semantic invariants.
    check_semantics(&definition, &mut errors);
    if !errors.is_empty() {
        return ValidationResult { errors, warnings, definition: None };
    }

    // Stage 5: warnings (never blocks).
    check_warnings(&definition, agents, sub_processes, &mut warnings);
    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), process = %definition.name, "validation warnings");
    }

    ValidationResult { errors, warnings, definition: Some(definition) }
}

// ---------------------------------------------------------------- stage 2 --

fn check_schema(root: &Map<String, Value>, errors: &mut Vec<ValidationIssue>) {
    match root.get("name").and_then(Value::as_str) {
        None => errors.push(ValidationIssue::new("name", "'name' is required")),
        Some(name) if !process_name_re().is_match(name) => errors.push(
            ValidationIssue::new("name", format!("'{name}' is not a valid process name"))
                .with_suggestion("must match ^[a-z][a-z0-9-]*$ and be 1-64 characters"),
        ),
        Some(_) => {}
    }

    let steps = match root.get("steps").and_then(Value::as_array) {
        Some(s) if !s.is_empty() => s,
        Some(_) => {
            errors.push(ValidationIssue::new("steps", "a process must have at least one step"));
            return;
        }
        None => {
            errors.push(ValidationIssue::new("steps", "'steps' is required and must be a non-empty array"));
            return;
        }
    };

    for (i, step) in steps.iter().enumerate() {
        let path = format!("steps[{i}]");
        let Some(obj) = step.as_object() else {
            errors.push(ValidationIssue::new(path, "each step must be a mapping"));
            continue;
        };
        check_step_schema(obj, &path, errors);
    }

    if let Some(triggers) = root.get("triggers") {
        match triggers.as_array() {
            Some(arr) => {
                for (i, t) in arr.iter().enumerate() {
                    check_trigger_schema(t, &format!("triggers[{i}]"), errors);
                }
            }
            None => errors.push(ValidationIssue::new("triggers", "'triggers' must be an array")),
        }
    }

    if let Some(outputs) = root.get("outputs") {
        match outputs.as_array() {
            Some(arr) => {
                for (i, o) in arr.iter().enumerate() {
                    let path = format!("outputs[{i}]");
                    let Some(obj) = o.as_object() else {
                        errors.push(ValidationIssue::new(&path, "each output must be a mapping"));
                        continue;
                    };
                    if obj.get("name").and_then(Value::as_str).is_none() {
                        errors.push(ValidationIssue::new(format!("{path}.name"), "'name' is required"));
                    }
                    if obj.get("source").and_then(Value::as_str).is_none() {
                        errors.push(ValidationIssue::new(format!("{path}.source"), "'source' is required"));
                    }
                }
            }
            None => errors.push(ValidationIssue::new("outputs", "'outputs' must be an array")),
        }
    }
}

fn check_step_schema(obj: &Map<String, Value>, path: &str, errors: &mut Vec<ValidationIssue>) {
    let Some(id) = obj.get("id").and_then(Value::as_str) else {
        errors.push(ValidationIssue::new(format!("{path}.id"), "'id' is required"));
        return;
    };
    if !step_id_re().is_match(id) {
        errors.push(
            ValidationIssue::new(format!("{path}.id"), format!("'{id}' is not a valid step id"))
                .with_suggestion("must match ^[a-z0-9_-]+$"),
        );
    }

    let Some(step_type) = obj.get("type").and_then(Value::as_str) else {
        errors.push(ValidationIssue::new(format!("{path}.type"), "'type' is required"));
        return;
    };

    match step_type {
        "agent_task" => {
            require_str(obj, "agent", path, "agent_task requires 'agent'", errors);
            require_str(obj, "message", path, "agent_task requires 'message'", errors);
        }
        "human_approval" => {}
        "gateway" => match obj.get("routes").and_then(Value::as_array) {
            Some(routes) if !routes.is_empty() => {
                for (i, r) in routes.iter().enumerate() {
                    let rpath = format!("{path}.routes[{i}]");
                    let Some(robj) = r.as_object() else {
                        errors.push(ValidationIssue::new(&rpath, "each route must be a mapping"));
                        continue;
                    };
                    require_str(robj, "condition", &rpath, "route requires 'condition'", errors);
                    require_str(robj, "target", &rpath, "route requires 'target'", errors);
                }
            }
            _ => errors.push(ValidationIssue::new(
                format!("{path}.routes"),
                "gateway requires a non-empty 'routes' array",
            )),
        },
        "timer" => {
            if obj.get("duration").is_none() && obj.get("until").is_none() {
                errors.push(ValidationIssue::new(
                    path,
                    "timer requires one of 'duration' or 'until'",
                ));
            }
        }
        "notification" => {
            match obj.get("channel").and_then(Value::as_str) {
                Some("slack") | Some("email") | Some("webhook") => {}
                Some(other) => errors.push(ValidationIssue::new(
                    format!("{path}.channel"),
                    format!("unknown notification channel '{other}'"),
                )),
                None => errors.push(ValidationIssue::new(format!("{path}.channel"), "'channel' is required")),
            }
            require_str(obj, "message", path, "notification requires 'message'", errors);
        }
        "sub_process" => {
            require_str(obj, "process_name", path, "sub_process requires 'process_name'", errors);
        }
        other => {
            errors.push(ValidationIssue::new(
                format!("{path}.type"),
                format!("unknown step type '{other}'"),
            ));
            return;
        }
    }

    if let Some(retry) = obj.get("retry") {
        let rpath = format!("{path}.retry");
        let Some(robj) = retry.as_object() else {
            errors.push(ValidationIssue::new(&rpath, "'retry' must be a mapping"));
            return;
        };
        if let Some(n) = robj.get("max_attempts") {
            match n.as_u64() {
                Some(v) if v >= 1 => {}
                _ => errors.push(ValidationIssue::new(
                    format!("{rpath}.max_attempts"),
                    "max_attempts must be an integer >= 1",
                )),
            }
        }
    }

    if let Some(on_error) = obj.get("on_error") {
        let epath = format!("{path}.on_error");
        let Some(eobj) = on_error.as_object() else {
            errors.push(ValidationIssue::new(&epath, "'on_error' must be a mapping"));
            return;
        };
        match eobj.get("action").and_then(Value::as_str) {
            Some("fail_process") | Some("skip_step") => {}
            Some("goto_step") => {
                require_str(eobj, "target_step", &epath, "goto_step requires 'target_step'", errors);
            }
            Some(other) => errors.push(ValidationIssue::new(
                format!("{epath}.action"),
                format!("unknown error action '{other}'"),
            )),
            None => errors.push(ValidationIssue::new(format!("{epath}.action"), "'action' is required")),
        }
    }

    if let Some(roles) = obj.get("roles") {
        let rpath = format!("{path}.roles");
        let Some(robj) = roles.as_object() else {
            errors.push(ValidationIssue::new(&rpath, "'roles' must be a mapping"));
            return;
        };
        if robj.get("executor").and_then(Value::as_str).is_none() {
            errors.push(ValidationIssue::new(
                format!("{rpath}.executor"),
                "'executor' is required when 'roles' is present",
            ));
        }
    }
}

fn check_trigger_schema(t: &Value, path: &str, errors: &mut Vec<ValidationIssue>) {
    let Some(obj) = t.as_object() else {
        errors.push(ValidationIssue::new(path, "each trigger must be a mapping"));
        return;
    };
    match obj.get("type").and_then(Value::as_str) {
        Some("manual") => {}
        Some("webhook") => {
            require_str(obj, "id", path, "webhook trigger requires 'id'", errors);
        }
        Some("schedule") => {
            require_str(obj, "cron", path, "schedule trigger requires 'cron'", errors);
            require_str(obj, "timezone", path, "schedule trigger requires 'timezone'", errors);
        }
        Some(other) => errors.push(ValidationIssue::new(
            format!("{path}.type"),
            format!("unknown trigger type '{other}'"),
        )),
        None => errors.push(ValidationIssue::new(format!("{path}.type"), "'type' is required")),
    }
}

fn require_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    message: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) => Some(s.to_string()),
        None => {
            errors.push(ValidationIssue::new(format!("{path}.{key}"), message));
            None
        }
    }
}

// ---------------------------------------------------------------- stage 3 --

fn parse_aggregate(
    root: &Map<String, Value>,
    created_by: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<ProcessDefinition> {
    let name = root.get("name")?.as_str()?.to_string();
    let description = root.get("description").and_then(Value::as_str).map(str::to_string);

    let version = match root.get("version").and_then(Value::as_str) {
        Some(v) => parse_version(v).unwrap_or_else(|| {
            errors.push(ValidationIssue::new("version", format!("invalid version string '{v}'")));
            Version::initial()
        }),
        None => Version::initial(),
    };

    let triggers = root
        .get("triggers")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .enumerate()
                .filter_map(|(i, t)| parse_trigger(t, &format!("triggers[{i}]"), errors))
                .collect()
        })
        .unwrap_or_else(|| vec![Trigger::Manual]);

    let outputs = root
        .get("outputs")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|o| {
                    let obj = o.as_object()?;
                    Some(Output {
                        name: obj.get("name")?.as_str()?.to_string(),
                        source: obj.get("source")?.as_str()?.to_string(),
                        description: obj.get("description").and_then(Value::as_str).map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let steps_value = root.get("steps")?.as_array()?;
    let mut steps = Vec::with_capacity(steps_value.len());
    for (i, s) in steps_value.iter().enumerate() {
        let path = format!("steps[{i}]");
        let obj = s.as_object()?;
        if let Some(step) = parse_step(obj, &path, &name, errors) {
            steps.push(step);
        }
    }

    let now = Utc::now();
    Some(ProcessDefinition {
        id: DefinitionId::new(),
        name,
        description,
        version,
        status: DefinitionStatus::Draft,
        steps,
        outputs,
        triggers,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    })
}

fn parse_version(raw: &str) -> Option<Version> {
    let (major, minor) = raw.split_once('.')?;
    Some(Version::new(major.parse().ok()?, minor.parse().ok()?))
}

fn parse_trigger(v: &Value, path: &str, errors: &mut Vec<ValidationIssue>) -> Option<Trigger> {
    let obj = v.as_object()?;
    match obj.get("type").and_then(Value::as_str)? {
        "manual" => Some(Trigger::Manual),
        "webhook" => Some(Trigger::Webhook { id: obj.get("id")?.as_str()?.to_string() }),
        "schedule" => {
            let cron = obj.get("cron")?.as_str()?.to_string();
            let timezone = obj.get("timezone")?.as_str()?.to_string();
            let description = obj.get("description").and_then(Value::as_str).map(str::to_string);
            if let Err(e) = validate_cron(&cron) {
                errors.push(ValidationIssue::new(format!("{path}.cron"), e.to_string()));
            }
            Some(Trigger::Schedule { cron: pe_domain::schedule::normalize_cron(&cron).to_string(), timezone, description })
        }
        _ => None,
    }
}

fn parse_duration_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<StdDuration> {
    let raw = obj.get(key)?.as_str()?;
    match parse_duration(raw) {
        Ok(d) => Some(d),
        Err(e) => {
            errors.push(ValidationIssue::new(format!("{path}.{key}"), e.to_string()));
            None
        }
    }
}

fn parse_step(
    obj: &Map<String, Value>,
    path: &str,
    process_name: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<StepDefinition> {
    let id = StepId::new(obj.get("id")?.as_str()?);
    let step_name = obj.get("name").and_then(Value::as_str).map(str::to_string);
    let step_type = obj.get("type")?.as_str()?;

    let config = parse_step_config(obj, step_type, path, process_name, errors)?;

    let dependencies: HashSet<StepId> = obj
        .get("dependencies")
        .or_else(|| obj.get("depends_on"))
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(StepId::new).collect())
        .unwrap_or_default();

    let condition = obj.get("condition").and_then(Value::as_str).map(str::to_string);

    let timeout = match obj.get("timeout") {
        Some(_) => parse_duration_field(obj, "timeout", path, errors),
        None => None,
    };

    let retry_policy = match obj.get("retry").and_then(Value::as_object) {
        Some(r) => {
            let max_attempts = r.get("max_attempts").and_then(Value::as_u64).unwrap_or(1) as u32;
            let initial_delay = r
                .get("initial_delay")
                .and_then(Value::as_str)
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(StdDuration::ZERO);
            let backoff_multiplier_millis = r
                .get("backoff_multiplier")
                .and_then(Value::as_f64)
                .map(|f| (f * 1000.0).round() as u32)
                .unwrap_or(1000);
            RetryPolicy { max_attempts, initial_delay, backoff_multiplier_millis }
        }
        None => RetryPolicy::default(),
    };

    let error_policy = match obj.get("on_error").and_then(Value::as_object) {
        Some(e) => {
            let action = match e.get("action").and_then(Value::as_str) {
                Some("skip_step") => ErrorAction::SkipStep,
                Some("goto_step") => ErrorAction::GotoStep {
                    target_step: StepId::new(e.get("target_step").and_then(Value::as_str).unwrap_or_default()),
                },
                _ => ErrorAction::FailProcess,
            };
            ErrorPolicy { action }
        }
        None => ErrorPolicy::default(),
    };

    let compensation = match obj.get("compensation").and_then(Value::as_object) {
        Some(c) => {
            let ctype = c.get("type").and_then(Value::as_str).unwrap_or("agent_task");
            parse_step_config(c, ctype, &format!("{path}.compensation"), process_name, errors)
                .map(|config| Compensation { config })
        }
        None => None,
    };

    let roles = match obj.get("roles").and_then(Value::as_object) {
        Some(r) => Some(Roles {
            executor: r.get("executor").and_then(Value::as_str).map(str::to_string),
            monitors: r
                .get("monitors")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            informed: r
                .get("informed")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        }),
        None => None,
    };

    Some(StepDefinition {
        id,
        name: step_name,
        config,
        dependencies,
        condition,
        retry_policy,
        error_policy,
        compensation,
        roles,
        timeout,
    })
}

fn parse_step_config(
    obj: &Map<String, Value>,
    step_type: &str,
    path: &str,
    process_name: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<StepConfig> {
    match step_type {
        "agent_task" => Some(StepConfig::AgentTask {
            agent: obj.get("agent")?.as_str()?.to_string(),
            message: obj.get("message")?.as_str()?.to_string(),
            model: obj.get("model").and_then(Value::as_str).map(str::to_string),
            temperature_millis: obj
                .get("temperature")
                .and_then(Value::as_f64)
                .map(|f| (f * 1000.0).round() as i64),
            timeout: parse_duration_field(obj, "timeout", path, errors),
        }),
        "human_approval" => {
            let timeout = obj
                .get("timeout")
                .and_then(Value::as_str)
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(StdDuration::from_secs(24 * 3600));
            Some(StepConfig::HumanApproval {
                title: obj.get("title").and_then(Value::as_str).map(str::to_string),
                description: obj.get("description").and_then(Value::as_str).map(str::to_string),
                assignees: obj
                    .get("assignees")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                timeout,
            })
        }
        "gateway" => {
            let routes = obj.get("routes")?.as_array()?;
            let routes = routes
                .iter()
                .filter_map(|r| {
                    let robj = r.as_object()?;
                    Some(GatewayRoute {
                        condition: robj.get("condition")?.as_str()?.to_string(),
                        target: StepId::new(robj.get("target")?.as_str()?),
                    })
                })
                .collect();
            let gateway_type = match obj.get("gateway_type").and_then(Value::as_str) {
                Some("parallel") => GatewayType::Parallel,
                _ => GatewayType::Exclusive,
            };
            let default_route = obj.get("default_route").and_then(Value::as_str).map(StepId::new);
            Some(StepConfig::Gateway { routes, gateway_type, default_route })
        }
        "timer" => {
            let duration = match obj.get("duration") {
                Some(_) => parse_duration_field(obj, "duration", path, errors),
                None => None,
            };
            let until = obj
                .get("until")
                .and_then(Value::as_str)
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            Some(StepConfig::Timer { duration, until })
        }
        "notification" => {
            let channel = match obj.get("channel").and_then(Value::as_str) {
                Some("slack") => NotificationChannel::Slack,
                Some("email") => NotificationChannel::Email,
                _ => NotificationChannel::Webhook,
            };
            Some(StepConfig::Notification {
                channel,
                message: obj.get("message")?.as_str()?.to_string(),
                subject: obj.get("subject").and_then(Value::as_str).map(str::to_string),
                recipients: obj
                    .get("recipients")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                webhook_url: obj.get("webhook_url").and_then(Value::as_str).map(str::to_string),
            })
        }
        "sub_process" => {
            let referenced = obj.get("process_name")?.as_str()?.to_string();
            if referenced == process_name {
                errors.push(ValidationIssue::new(
                    format!("{path}.process_name"),
                    format!("sub_process '{referenced}' is the same as its own process — self-recursion is not allowed"),
                ));
            }
            let timeout = obj
                .get("timeout")
                .and_then(Value::as_str)
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(StdDuration::from_secs(3600));
            let input_mapping: HashMap<String, String> = obj
                .get("input_mapping")
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            Some(StepConfig::SubProcess {
                process_name: referenced,
                version: obj.get("version").and_then(Value::as_str).map(str::to_string),
                input_mapping,
                output_key: obj
                    .get("output_key")
                    .and_then(Value::as_str)
                    .unwrap_or("result")
                    .to_string(),
                wait_for_completion: obj.get("wait_for_completion").and_then(Value::as_bool).unwrap_or(true),
                timeout,
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------- stage 4 --

fn check_semantics(definition: &ProcessDefinition, errors: &mut Vec<ValidationIssue>) {
    let mut seen = HashSet::new();
    for step in &definition.steps {
        if !seen.insert(step.id.clone()) {
            errors.push(ValidationIssue::new("steps", format!("duplicate step id '{}'", step.id)));
        }
    }
    if !errors.is_empty() {
        return;
    }

    let ids: HashSet<&StepId> = definition.steps.iter().map(|s| &s.id).collect();
    for step in &definition.steps {
        for dep in &step.dependencies {
            if !ids.contains(dep) {
                errors.push(ValidationIssue::new(
                    format!("steps[{}].dependencies", step.id),
                    format!("unknown dependency '{dep}'"),
                ));
            }
        }
        if let ErrorAction::GotoStep { target_step } = &step.error_policy.action {
            if !ids.contains(target_step) {
                errors.push(ValidationIssue::new(
                    format!("steps[{}].on_error.target_step", step.id),
                    format!("goto_step target '{target_step}' does not exist"),
                ));
            }
        }
    }
    if !errors.is_empty() {
        return;
    }

    let step_ids: Vec<StepId> = definition.steps.iter().map(|s| s.id.clone()).collect();
    let deps: HashMap<StepId, HashSet<StepId>> = definition
        .steps
        .iter()
        .map(|s| (s.id.clone(), s.dependencies.clone()))
        .collect();
    if let Err(stuck) = pe_domain::topological_order(&step_ids, &deps) {
        errors.push(ValidationIssue::new(
            "steps",
            format!("dependency cycle detected involving step '{stuck}'"),
        ));
    }
}

// ---------------------------------------------------------------- stage 5 --

fn check_warnings(
    definition: &ProcessDefinition,
    agents: Option<&dyn AgentAvailability>,
    sub_processes: Option<&dyn SubProcessLookup>,
    warnings: &mut Vec<ValidationIssue>,
) {
    for step in &definition.steps {
        match &step.config {
            StepConfig::AgentTask { agent, .. } => {
                if let Some(known) = agents {
                    if !known.is_known(agent) {
                        warnings.push(ValidationIssue::new(
                            format!("steps[{}].agent", step.id),
                            format!("agent '{agent}' is unknown or not running"),
                        ));
                    }
                }
            }
            StepConfig::SubProcess { process_name, version, .. } => {
                if let Some(lookup) = sub_processes {
                    if !lookup.is_published(process_name, version.as_deref()) {
                        warnings.push(ValidationIssue::new(
                            format!("steps[{}].process_name", step.id),
                            format!("sub-process '{process_name}' is missing or not published"),
                        ));
                    }
                }
            }
            _ => {}
        }
    }
}
