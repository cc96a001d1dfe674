//! Shared DAG utilities: Kahn's-algorithm topological order, used by both the
//! validator's cycle detection and the engine's
//! `DependencyResolver`.

use crate::ids::StepId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Returns the steps in topological order, or the id of a step that
/// participates in a cycle.
pub fn topological_order(
    ids: &[StepId],
    deps: &HashMap<StepId, HashSet<StepId>>,
) -> Result<Vec<StepId>, StepId> {
    let empty = HashSet::new();
    let mut in_degree: HashMap<&StepId, usize> =
        ids.iter().map(|id| (id, deps.get(id).unwrap_or(&empty).len())).collect();

    // successors[d] = steps that depend on d
    let mut successors: HashMap<&StepId, Vec<&StepId>> = HashMap::new();
    for id in ids {
        for dep in deps.get(id).unwrap_or(&empty) {
            successors.entry(dep).or_default().push(id);
        }
    }

    let mut queue: VecDeque<&StepId> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| *id)
        .collect();
    // Stable order: sort the initial frontier by input order.
    let order_index: HashMap<&StepId, usize> =
        ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let mut queue: Vec<&StepId> = queue.drain(..).collect();
    queue.sort_by_key(|id| order_index[id]);
    let mut queue: VecDeque<&StepId> = queue.into();

    let mut result = Vec::with_capacity(ids.len());
    while let Some(id) = queue.pop_front() {
        result.push(id.clone());
        if let Some(succs) = successors.get(id) {
            let mut ready = Vec::new();
            for succ in succs {
                let deg = in_degree.get_mut(succ).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.push(*succ);
                }
            }
            ready.sort_by_key(|id| order_index[id]);
            for r in ready {
                queue.push_back(r);
            }
        }
    }

    if result.len() != ids.len() {
        let stuck = ids
            .iter()
            .find(|id| !result.contains(id))
            .expect("result shorter than ids implies an unvisited id exists")
            .clone();
        return Err(stuck);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps_map(pairs: &[(&str, &[&str])]) -> (Vec<StepId>, HashMap<StepId, HashSet<StepId>>) {
        let ids: Vec<StepId> = pairs.iter().map(|(id, _)| StepId::from(*id)).collect();
        let deps = pairs
            .iter()
            .map(|(id, d)| {
                (
                    StepId::from(*id),
                    d.iter().map(|x| StepId::from(*x)).collect(),
                )
            })
            .collect();
        (ids, deps)
    }

    #[test]
    fn linear_chain_orders_correctly() {
        let (ids, deps) = deps_map(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let order = topological_order(&ids, &deps).unwrap();
        assert_eq!(
            order,
            vec![StepId::from("a"), StepId::from("b"), StepId::from("c")]
        );
    }

    #[test]
    fn detects_a_cycle() {
        let (ids, deps) = deps_map(&[("a", &["b"]), ("b", &["a"])]);
        assert!(topological_order(&ids, &deps).is_err());
    }

    #[test]
    fn diamond_shape_orders_with_fan_in() {
        let (ids, deps) = deps_map(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);
        let order = topological_order(&ids, &deps).unwrap();
        assert_eq!(order.first().unwrap(), &StepId::from("a"));
        assert_eq!(order.last().unwrap(), &StepId::from("d"));
        assert_eq!(order.len(), 4);
    }
}
