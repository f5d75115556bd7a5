use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::StructureTypeInfo;

/// Result of ordering a set of structure types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadOrder {
    /// Dependencies before dependents; ties broken by name.
    pub order: Vec<String>,
    /// Types on a dependency cycle.
    pub cyclic: Vec<String>,
    /// Types that only depend on a cycle without being part of one.
    pub blocked: Vec<String>,
}

/// Order `types` leaves-first. Dependencies on names outside `types` are
/// ignored here; the loader reports them.
pub fn load_order(types: &[StructureTypeInfo]) -> LoadOrder {
    let names: HashSet<&str> = types.iter().map(|t| t.name.as_str()).collect();
    let mut indeg: HashMap<&str, usize> = HashMap::new();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();

    for t in types {
        indeg.entry(t.name.as_str()).or_insert(0);
        let deps: BTreeSet<&str> = t
            .dependencies
            .iter()
            .map(|d| d.name.as_str())
            .filter(|d| names.contains(d))
            .collect();
        for dep in deps {
            adj.entry(dep).or_default().push(t.name.as_str());
            *indeg.entry(t.name.as_str()).or_default() += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indeg
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(k, _)| *k)
        .collect();

    let mut order = Vec::with_capacity(indeg.len());
    while let Some(u) = ready.pop_first() {
        order.push(u.to_string());
        if let Some(vs) = adj.get(u) {
            for v in vs {
                if let Some(d) = indeg.get_mut(v) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(*v);
                    }
                }
            }
        }
    }

    let mut leftover: Vec<&str> = indeg
        .iter()
        .filter(|(_, &d)| d > 0)
        .map(|(k, _)| *k)
        .collect();
    leftover.sort_unstable();
    let (cyclic, blocked): (Vec<&str>, Vec<&str>) = leftover
        .into_iter()
        .partition(|n| reaches(&adj, n, n));

    LoadOrder {
        order,
        cyclic: cyclic.into_iter().map(str::to_string).collect(),
        blocked: blocked.into_iter().map(str::to_string).collect(),
    }
}

/// Whether `to` is reachable from `from` over at least one edge.
fn reaches(adj: &HashMap<&str, Vec<&str>>, from: &str, to: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<&str> = adj.get(from).cloned().unwrap_or_default();
    while let Some(n) = stack.pop() {
        if n == to {
            return true;
        }
        if seen.insert(n) {
            if let Some(next) = adj.get(n) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dependency;

    fn info(name: &str, deps: &[&str]) -> StructureTypeInfo {
        StructureTypeInfo::new(
            name,
            1,
            deps.iter().map(|d| Dependency::new(*d, 1, 1)).collect(),
        )
    }

    #[test]
    fn leaves_first_with_sorted_ties() {
        let types = vec![
            info("clock", &["windmill", "drawbridge"]),
            info("windmill", &["drawbridge"]),
            info("portcullis", &[]),
            info("drawbridge", &["big_door"]),
            info("big_door", &[]),
        ];
        let order = load_order(&types);
        assert_eq!(
            order.order,
            vec!["big_door", "drawbridge", "portcullis", "windmill", "clock"]
        );
        assert!(order.cyclic.is_empty() && order.blocked.is_empty());
    }

    #[test]
    fn cycles_are_split_from_their_dependents() {
        let types = vec![
            info("a", &["b"]),
            info("b", &["a"]),
            info("c", &["a"]),
            info("d", &[]),
            info("self", &["self"]),
        ];
        let order = load_order(&types);
        assert_eq!(order.order, vec!["d"]);
        assert_eq!(order.cyclic, vec!["a", "b", "self"]);
        assert_eq!(order.blocked, vec!["c"]);
    }

    #[test]
    fn unknown_dependencies_do_not_block_ordering() {
        let order = load_order(&[info("flag", &["banner"])]);
        assert_eq!(order.order, vec!["flag"]);
    }
}
