//! Plan generation — diff freshly synthesized stacks against the lock.
//!
//! The plan is advisory: it reports what the provisioning engine would
//! do, it never mutates anything.

use super::synth::SynthesizedStack;
use super::types::{PlanAction, PlannedChange, SynthLock, SynthPlan};

/// Diff desired synthesis output against the last recorded lock.
pub fn plan(site: &str, desired: &[SynthesizedStack], lock: Option<&SynthLock>) -> SynthPlan {
    let mut changes = Vec::new();
    let mut to_create = 0u32;
    let mut to_update = 0u32;
    let mut to_destroy = 0u32;
    let mut unchanged = 0u32;

    for stack in desired {
        let locked = lock.and_then(|l| l.stacks.get(&stack.name));

        for (logical_id, entry) in &stack.resources {
            let action = match locked.and_then(|s| s.resources.get(logical_id)) {
                None => PlanAction::Create,
                Some(prior) if prior.hash == entry.hash => PlanAction::NoOp,
                Some(_) => PlanAction::Update,
            };
            match action {
                PlanAction::Create => to_create += 1,
                PlanAction::Update => to_update += 1,
                PlanAction::Destroy => to_destroy += 1,
                PlanAction::NoOp => unchanged += 1,
            }
            changes.push(PlannedChange {
                stack: stack.name.clone(),
                logical_id: logical_id.clone(),
                resource_type: entry.resource_type.clone(),
                action,
                description: describe(logical_id, &entry.resource_type, action),
            });
        }

        // Resources only present in the lock are going away
        if let Some(locked) = locked {
            for (logical_id, prior) in &locked.resources {
                if !stack.resources.contains_key(logical_id) {
                    to_destroy += 1;
                    changes.push(PlannedChange {
                        stack: stack.name.clone(),
                        logical_id: logical_id.clone(),
                        resource_type: prior.resource_type.clone(),
                        action: PlanAction::Destroy,
                        description: describe(
                            logical_id,
                            &prior.resource_type,
                            PlanAction::Destroy,
                        ),
                    });
                }
            }
        }
    }

    // Whole stacks only present in the lock are going away
    if let Some(lock) = lock {
        for (stack_name, locked) in &lock.stacks {
            if desired.iter().any(|s| &s.name == stack_name) {
                continue;
            }
            for (logical_id, prior) in &locked.resources {
                to_destroy += 1;
                changes.push(PlannedChange {
                    stack: stack_name.clone(),
                    logical_id: logical_id.clone(),
                    resource_type: prior.resource_type.clone(),
                    action: PlanAction::Destroy,
                    description: describe(logical_id, &prior.resource_type, PlanAction::Destroy),
                });
            }
        }
    }

    SynthPlan {
        site: site.to_string(),
        changes,
        stack_order: desired.iter().map(|s| s.name.clone()).collect(),
        to_create,
        to_update,
        to_destroy,
        unchanged,
    }
}

fn describe(logical_id: &str, resource_type: &str, action: PlanAction) -> String {
    match action {
        PlanAction::Create => format!("{}: create {}", logical_id, resource_type),
        PlanAction::Update => format!("{}: update (declaration changed)", logical_id),
        PlanAction::Destroy => format!("{}: destroy {}", logical_id, resource_type),
        PlanAction::NoOp => format!("{}: no changes", logical_id),
    }
}
