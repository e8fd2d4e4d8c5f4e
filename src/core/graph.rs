//! Cross-stack dependency resolution.
//!
//! Every import must name an assembled upstream stack output; the edges
//! produce a deterministic topological order (Kahn's algorithm with
//! alphabetical tie-breaking) and cycles are reported with the
//! participating stack names.

use crate::stacks::StackSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Verify every import resolves to a declared upstream output.
pub fn check_imports(set: &StackSet) -> Result<(), String> {
    for stack in &set.stacks {
        for (producer, output) in stack.consumed_imports() {
            let Some(upstream) = set.get(&producer) else {
                return Err(format!(
                    "stack '{}' imports from '{}', which is not assembled",
                    stack.name, producer
                ));
            };
            if upstream.name == stack.name {
                return Err(format!(
                    "stack '{}' imports its own output '{}'",
                    stack.name, output
                ));
            }
            if !upstream.outputs.contains_key(&output) {
                return Err(format!(
                    "stack '{}' imports '{}.{}', but '{}' does not export it",
                    stack.name, producer, output, producer
                ));
            }
        }
    }
    Ok(())
}

/// Compute the deployment order from import edges.
pub fn stack_order(set: &StackSet) -> Result<Vec<String>, String> {
    check_imports(set)?;

    let names: Vec<String> = set.names();
    let mut in_degree: FxHashMap<String, usize> = FxHashMap::default();
    let mut adjacency: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for name in &names {
        in_degree.insert(name.clone(), 0);
        adjacency.insert(name.clone(), Vec::new());
    }

    for stack in &set.stacks {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for (producer, _) in stack.consumed_imports() {
            if seen.insert(producer.clone()) {
                adjacency
                    .get_mut(&producer)
                    .ok_or_else(|| format!("unknown stack '{}'", producer))?
                    .push(stack.name.clone());
                *in_degree
                    .get_mut(&stack.name)
                    .ok_or_else(|| format!("unknown stack '{}'", stack.name))? += 1;
            }
        }
    }

    // Kahn's algorithm with sorted tie-breaking
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut zero_degree: Vec<String> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(name, _)| name.clone())
        .collect();
    zero_degree.sort();
    for name in zero_degree {
        queue.push_back(name);
    }

    let mut order = Vec::new();
    while let Some(current) = queue.pop_front() {
        order.push(current.clone());

        let mut next_ready: Vec<String> = Vec::new();
        if let Some(neighbors) = adjacency.get(&current) {
            for neighbor in neighbors {
                let degree = in_degree
                    .get_mut(neighbor)
                    .ok_or_else(|| format!("unknown stack '{}'", neighbor))?;
                *degree -= 1;
                if *degree == 0 {
                    next_ready.push(neighbor.clone());
                }
            }
        }
        next_ready.sort();
        for name in next_ready {
            queue.push_back(name);
        }
    }

    if order.len() != names.len() {
        let ordered: FxHashSet<&String> = order.iter().collect();
        let mut cycle_members: Vec<&str> = names
            .iter()
            .filter(|n| !ordered.contains(n))
            .map(|n| n.as_str())
            .collect();
        cycle_members.sort_unstable();
        return Err(format!(
            "stack dependency cycle involving: {}",
            cycle_members.join(", ")
        ));
    }

    Ok(order)
}
