//! Configuration-consistency checks over an assembled stack set.
//!
//! These run on every validate and synth:
//! - derived physical names are unique across stacks,
//! - storage removal policy is retain-in-production, destroy elsewhere,
//! - every function role carries exactly its binding-derived statements,
//! - every distribution behavior resolves to an origin in the same stack,
//! - budgets carry the fixed phase mapping,
//! - same-stack references resolve and schedule expressions are
//!   well-formed.

use super::context::{EnvContext, RemovalPolicy};
use super::parser::ValidationError;
use crate::core::types::ValueRef;
use crate::resources::ResourceSpec;
use crate::stacks::{Stack, StackSet};
use regex::Regex;
use rustc_hash::FxHashMap;

fn error(message: String) -> ValidationError {
    ValidationError { message }
}

/// Run every consistency check. Returns all findings (empty = consistent).
pub fn check_stack_set(set: &StackSet, ctx: &EnvContext) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_unique_names(set, &mut errors);
    for stack in &set.stacks {
        check_removal_policies(stack, ctx, &mut errors);
        check_function_roles(stack, &mut errors);
        check_distributions(stack, &mut errors);
        check_budgets(stack, ctx, &mut errors);
        check_local_refs(stack, &mut errors);
        check_schedules(stack, &mut errors);
    }
    errors
}

/// Derived physical names must be unique across the whole set.
fn check_unique_names(set: &StackSet, errors: &mut Vec<ValidationError>) {
    let mut seen: FxHashMap<String, (String, String)> = FxHashMap::default();
    for stack in &set.stacks {
        for (logical_id, spec) in &stack.resources {
            let Some(name) = spec.physical_name() else {
                continue;
            };
            if let Some((other_stack, other_id)) =
                seen.insert(name.to_string(), (stack.name.clone(), logical_id.clone()))
            {
                errors.push(error(format!(
                    "name '{}' declared by both {}.{} and {}.{}",
                    name, other_stack, other_id, stack.name, logical_id
                )));
            }
        }
    }
}

/// Storage resources are retained in production and destroyed elsewhere.
fn check_removal_policies(stack: &Stack, ctx: &EnvContext, errors: &mut Vec<ValidationError>) {
    let expected = ctx.removal_policy();
    for (logical_id, spec) in &stack.resources {
        if let Some(policy) = spec.removal_policy() {
            if policy != expected {
                errors.push(error(format!(
                    "{}.{} has removal policy {}, {} requires {}",
                    stack.name,
                    logical_id,
                    policy,
                    ctx.environment,
                    RemovalPolicy::deletion_policy(expected)
                )));
            }
        }
    }
}

/// A function's execution role carries exactly the derived statements.
fn check_function_roles(stack: &Stack, errors: &mut Vec<ValidationError>) {
    for (logical_id, spec) in &stack.resources {
        let ResourceSpec::Function(function) = spec else {
            continue;
        };
        let ValueRef::Attr { ref resource, .. } = function.role else {
            errors.push(error(format!(
                "{}.{} does not reference a same-stack execution role",
                stack.name, logical_id
            )));
            continue;
        };
        let Some(ResourceSpec::Role(role)) = stack.resources.get(resource) else {
            errors.push(error(format!(
                "{}.{} references missing execution role '{}'",
                stack.name, logical_id, resource
            )));
            continue;
        };
        if role.statements != function.role_statements() {
            errors.push(error(format!(
                "{}.{} grants diverge from its declared bindings",
                stack.name, resource
            )));
        }
    }
}

/// Behavior paths and the default behavior resolve to declared origins.
fn check_distributions(stack: &Stack, errors: &mut Vec<ValidationError>) {
    for (logical_id, spec) in &stack.resources {
        let ResourceSpec::Distribution(dist) = spec else {
            continue;
        };
        let origin_ids: Vec<&str> = dist.origins.iter().map(|o| o.id.as_str()).collect();
        if !origin_ids.contains(&dist.default_origin_id.as_str()) {
            errors.push(error(format!(
                "{}.{} default behavior targets unknown origin '{}'",
                stack.name, logical_id, dist.default_origin_id
            )));
        }
        for behavior in &dist.behaviors {
            if !origin_ids.contains(&behavior.origin_id.as_str()) {
                errors.push(error(format!(
                    "{}.{} behavior '{}' targets unknown origin '{}'",
                    stack.name, logical_id, behavior.path_pattern, behavior.origin_id
                )));
            }
        }
    }
}

/// Budgets carry the fixed phase mapping.
fn check_budgets(stack: &Stack, ctx: &EnvContext, errors: &mut Vec<ValidationError>) {
    for (logical_id, spec) in &stack.resources {
        let ResourceSpec::Budget(budget) = spec else {
            continue;
        };
        let expected = ctx.budget_limit_usd();
        if budget.limit_usd != expected {
            errors.push(error(format!(
                "{}.{} limit is {} USD, phase {} requires {}",
                stack.name, logical_id, budget.limit_usd, ctx.phase, expected
            )));
        }
    }
}

/// Same-stack references resolve to declared logical ids.
fn check_local_refs(stack: &Stack, errors: &mut Vec<ValidationError>) {
    for (logical_id, spec) in &stack.resources {
        for target in spec.local_refs() {
            if !stack.resources.contains_key(&target) {
                errors.push(error(format!(
                    "{}.{} references unknown logical id '{}'",
                    stack.name, logical_id, target
                )));
            }
        }
    }
    for (key, output) in &stack.outputs {
        let targets = match &output.value {
            ValueRef::LogicalRef(id) => vec![id.clone()],
            ValueRef::Attr { resource, .. } => vec![resource.clone()],
            ValueRef::Sub(template) => crate::resources::sub_references(template),
            _ => vec![],
        };
        for target in targets {
            if !stack.resources.contains_key(&target) {
                errors.push(error(format!(
                    "{} output '{}' references unknown logical id '{}'",
                    stack.name, key, target
                )));
            }
        }
    }
}

/// Schedule expressions are `cron(...)` or `rate(...)` and target a
/// function.
fn check_schedules(stack: &Stack, errors: &mut Vec<ValidationError>) {
    let shape = Regex::new(r"^(cron|rate)\(.+\)$").expect("valid literal regex");
    for (logical_id, spec) in &stack.resources {
        let ResourceSpec::Schedule(schedule) = spec else {
            continue;
        };
        if !shape.is_match(&schedule.expression) {
            errors.push(error(format!(
                "{}.{} expression '{}' is not cron(...) or rate(...)",
                stack.name, logical_id, schedule.expression
            )));
        }
        match stack.resources.get(&schedule.target_function) {
            Some(ResourceSpec::Function(_)) => {}
            Some(_) => errors.push(error(format!(
                "{}.{} target '{}' is not a function",
                stack.name, logical_id, schedule.target_function
            ))),
            // missing id already reported by the reference check
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Environment, SiteConfig};
    use crate::resources::compute::ScheduleSpec;
    use crate::resources::identity::{ArnPattern, PolicyStatement};
    use crate::stacks::{assemble, test_support};

    fn assembled(config: &SiteConfig) -> (StackSet, EnvContext) {
        (assemble(config).unwrap(), EnvContext::from_config(config))
    }

    #[test]
    fn test_production_assembly_is_consistent() {
        let (set, ctx) = assembled(&test_support::production_config());
        let errors = check_stack_set(&set, &ctx);
        assert!(
            errors.is_empty(),
            "unexpected findings: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_simple_dev_assembly_is_consistent() {
        let (set, ctx) = assembled(&test_support::simple_dev_config());
        let errors = check_stack_set(&set, &ctx);
        assert!(
            errors.is_empty(),
            "unexpected findings: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_every_environment_is_collision_free() {
        for environment in Environment::all() {
            let mut config = test_support::production_config();
            config.environment = environment;
            let (set, ctx) = assembled(&config);
            let errors = check_stack_set(&set, &ctx);
            let collisions: Vec<_> = errors
                .iter()
                .filter(|e| e.message.contains("declared by both"))
                .collect();
            assert!(collisions.is_empty(), "{}: {:?}", environment, collisions);
        }
    }

    #[test]
    fn test_duplicate_name_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        // Rename the seo api to collide with the backend api
        let seo = set.stacks.iter_mut().find(|s| s.name == "seo").unwrap();
        if let ResourceSpec::HttpApi(ref mut api) = seo.resources["SeoApi"] {
            api.api_name = "jane-doe-backend-api-production".to_string();
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors.iter().any(|e| e.message.contains("declared by both")));
    }

    #[test]
    fn test_wrong_removal_policy_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let core = set.stacks.iter_mut().find(|s| s.name == "core").unwrap();
        if let ResourceSpec::Bucket(ref mut bucket) = core.resources["MediaBucket"] {
            bucket.removal_policy = RemovalPolicy::Destroy;
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("removal policy")));
    }

    #[test]
    fn test_widened_role_grant_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let backend = set.stacks.iter_mut().find(|s| s.name == "backend").unwrap();
        if let ResourceSpec::Role(ref mut role) = backend.resources["ProjectsFnRole"] {
            role.statements.push(PolicyStatement::new(
                &["s3:*"],
                vec![ArnPattern::of(crate::core::types::ValueRef::literal("*"))],
            ));
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors.iter().any(|e| e.message.contains("diverge")));
    }

    #[test]
    fn test_dangling_behavior_origin_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let frontend = set
            .stacks
            .iter_mut()
            .find(|s| s.name == "frontend")
            .unwrap();
        if let ResourceSpec::Distribution(ref mut dist) =
            frontend.resources["SiteDistribution"]
        {
            dist.behaviors[0].origin_id = "ghost".to_string();
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("unknown origin 'ghost'")));
    }

    #[test]
    fn test_wrong_budget_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let cost = set.stacks.iter_mut().find(|s| s.name == "cost").unwrap();
        if let ResourceSpec::Budget(ref mut budget) = cost.resources["SiteBudget"] {
            budget.limit_usd = 999;
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors.iter().any(|e| e.message.contains("999")));
    }

    #[test]
    fn test_dangling_local_ref_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let seo = set.stacks.iter_mut().find(|s| s.name == "seo").unwrap();
        if let ResourceSpec::Schedule(ref mut schedule) = seo.resources["SitemapDaily"] {
            schedule.target_function = "GhostFn".to_string();
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("unknown logical id 'GhostFn'")));
    }

    #[test]
    fn test_malformed_schedule_expression_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let seo = set.stacks.iter_mut().find(|s| s.name == "seo").unwrap();
        if let ResourceSpec::Schedule(ref mut schedule) = seo.resources["SitemapDaily"] {
            schedule.expression = "daily at 3".to_string();
        }
        let errors = check_stack_set(&set, &ctx);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("not cron(...) or rate(...)")));
    }

    #[test]
    fn test_schedule_targeting_non_function_detected() {
        let (mut set, ctx) = assembled(&test_support::production_config());
        let cost = set.stacks.iter_mut().find(|s| s.name == "cost").unwrap();
        cost.add(
            "BadSchedule",
            ResourceSpec::Schedule(ScheduleSpec {
                rule_name: "jane-doe-cost-bad-production".to_string(),
                expression: "rate(1 day)".to_string(),
                target_function: "SiteBudget".to_string(),
                enabled: true,
            }),
        )
        .unwrap();
        let errors = check_stack_set(&set, &ctx);
        assert!(errors.iter().any(|e| e.message.contains("not a function")));
    }
}
