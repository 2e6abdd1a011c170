//! Transitive closure over parent/child relations.
//!
//! Hierarchies come from the store as adjacency maps (procedure child →
//! parents, composite property → children). Closures are computed with an
//! explicit stack so that deep chains cannot overflow the thread stack, and
//! cycles are detected instead of looping forever.

use std::collections::{BTreeSet, HashMap};

/// Result of a closure computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure<T: Ord> {
    /// Every node reachable from the start node, excluding the start node.
    pub members: BTreeSet<T>,
    /// Whether a cycle was found on the way.
    pub cyclic: bool,
}

impl<T: Ord> Default for Closure<T> {
    fn default() -> Self {
        Self {
            members: BTreeSet::new(),
            cyclic: false,
        }
    }
}

/// Compute the set of nodes reachable from `start` through `next`.
///
/// `next` returns the direct successors of a node. A back-edge (an edge to
/// a node still on the current traversal path, including `start` itself)
/// sets [`Closure::cyclic`]; traversal still terminates and the members
/// found so far are kept.
///
/// # Example
///
/// ```
/// use std::collections::{BTreeSet, HashMap};
/// use sensorcache::update::hierarchy::closure;
///
/// let parents: HashMap<&str, Vec<&str>> =
///     HashMap::from([("a", vec!["b"]), ("b", vec!["c"])]);
/// let result = closure(&"a", |n| parents.get(n).cloned().unwrap_or_default());
/// assert_eq!(result.members, BTreeSet::from(["b", "c"]));
/// assert!(!result.cyclic);
/// ```
pub fn closure<T, F, I>(start: &T, mut next: F) -> Closure<T>
where
    T: Ord + Clone,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut result = Closure::default();
    let mut on_path: BTreeSet<T> = BTreeSet::new();

    // Each frame holds a node and its not yet visited successors.
    let mut stack: Vec<(T, Vec<T>)> = Vec::new();
    on_path.insert(start.clone());
    stack.push((start.clone(), successors(&mut next, start)));

    while let Some((node, pending)) = stack.last_mut() {
        match pending.pop() {
            Some(child) => {
                if on_path.contains(&child) {
                    result.cyclic = true;
                } else if result.members.insert(child.clone()) {
                    let children = successors(&mut next, &child);
                    on_path.insert(child.clone());
                    stack.push((child, children));
                }
            }
            None => {
                let node = node.clone();
                on_path.remove(&node);
                stack.pop();
            }
        }
    }

    result
}

fn successors<T, F, I>(next: &mut F, node: &T) -> Vec<T>
where
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut children: Vec<T> = next(node).into_iter().collect();
    // Pop order then follows the natural order of the ids.
    children.reverse();
    children
}

/// Closure over a string adjacency map.
pub fn closure_in(map: &HashMap<String, BTreeSet<String>>, start: &str) -> Closure<String> {
    closure(&start.to_string(), |node| {
        map.get(node).cloned().unwrap_or_default()
    })
}

/// Reverse every edge of an adjacency map.
pub fn invert(map: &HashMap<String, BTreeSet<String>>) -> HashMap<String, BTreeSet<String>> {
    let mut inverted: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (from, targets) in map {
        for to in targets {
            inverted
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
        }
    }
    inverted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(edges: &[(&str, &str)]) -> HashMap<String, BTreeSet<String>> {
        let mut map: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (from, to) in edges {
            map.entry(from.to_string()).or_default().insert(to.to_string());
        }
        map
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chain() {
        let parents = map(&[("c", "b"), ("b", "a")]);
        let result = closure_in(&parents, "c");
        assert_eq!(result.members, set(&["a", "b"]));
        assert!(!result.cyclic);
    }

    #[test]
    fn test_diamond_is_not_cyclic() {
        let parents = map(&[("d", "b"), ("d", "c"), ("b", "a"), ("c", "a")]);
        let result = closure_in(&parents, "d");
        assert_eq!(result.members, set(&["a", "b", "c"]));
        assert!(!result.cyclic);
    }

    #[test]
    fn test_two_cycle_terminates() {
        let parents = map(&[("a", "b"), ("b", "a")]);
        let result = closure_in(&parents, "a");
        assert_eq!(result.members, set(&["b"]));
        assert!(result.cyclic);
    }

    #[test]
    fn test_self_loop() {
        let parents = map(&[("a", "a")]);
        let result = closure_in(&parents, "a");
        assert!(result.members.is_empty());
        assert!(result.cyclic);
    }

    #[test]
    fn test_cycle_below_start() {
        let parents = map(&[("x", "a"), ("a", "b"), ("b", "a")]);
        let result = closure_in(&parents, "x");
        assert_eq!(result.members, set(&["a", "b"]));
        assert!(result.cyclic);
    }

    #[test]
    fn test_unknown_start() {
        let result = closure_in(&HashMap::new(), "nobody");
        assert_eq!(result, Closure::default());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let edges: Vec<(String, String)> = (0..100_000)
            .map(|i| (i.to_string(), (i + 1).to_string()))
            .collect();
        let mut parents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (from, to) in edges {
            parents.entry(from).or_default().insert(to);
        }
        let result = closure_in(&parents, "0");
        assert_eq!(result.members.len(), 100_000);
    }

    #[test]
    fn test_invert() {
        let parents = map(&[("c", "a"), ("b", "a"), ("c", "b")]);
        let children = invert(&parents);
        assert_eq!(children.get("a"), Some(&set(&["b", "c"])));
        assert_eq!(children.get("b"), Some(&set(&["c"])));
        assert_eq!(children.get("c"), None);
    }

    proptest! {
        /// Anything reachable from a member is reachable from the start.
        #[test]
        fn prop_closure_is_transitive(
            edges in prop::collection::vec((0u8..12, 0u8..12), 0..40),
            start in 0u8..12,
        ) {
            let mut graph: HashMap<u8, Vec<u8>> = HashMap::new();
            for (from, to) in &edges {
                graph.entry(*from).or_default().push(*to);
            }
            let next = |n: &u8| graph.get(n).cloned().unwrap_or_default();

            let from_start = closure(&start, next);
            for member in &from_start.members {
                let from_member = closure(member, next);
                for reached in from_member.members {
                    prop_assert!(reached == start || from_start.members.contains(&reached));
                }
            }
        }

        /// Edges only from lower to higher ids can never form a cycle.
        #[test]
        fn prop_acyclic_graphs_report_no_cycle(
            edges in prop::collection::vec((0u8..12, 0u8..12), 0..40),
            start in 0u8..12,
        ) {
            let mut graph: HashMap<u8, Vec<u8>> = HashMap::new();
            for (a, b) in edges.iter().filter(|(a, b)| a < b) {
                graph.entry(*a).or_default().push(*b);
            }
            let result = closure(&start, |n| graph.get(n).cloned().unwrap_or_default());
            prop_assert!(!result.cyclic);
            prop_assert!(!result.members.contains(&start));
        }
    }
}
