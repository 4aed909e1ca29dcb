//! same_as chain resolution within one scope.
//!
//! Chains are walked iteratively over an index arena. Every entry on a walk
//! shares the walk's outcome, so each entry is visited once per scope.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::entry::CurationEntry;

/// Where an entry's same_as chain ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The chain reaches an entry that is not itself a same_as alias.
    Terminal(String),
    /// The chain points at a raw name missing from the scope.
    Dangling(String),
    /// The chain loops back on itself.
    Circular,
}

impl ChainOutcome {
    /// The terminal entry key, when the chain resolves.
    pub fn terminal(&self) -> Option<&str> {
        match self {
            ChainOutcome::Terminal(key) => Some(key),
            _ => None,
        }
    }
}

#[derive(Clone)]
enum WalkState {
    Unvisited,
    OnPath,
    Done(ChainOutcome),
}

/// Resolve the same_as chain of every entry in a scope.
///
/// Entries that are not aliases resolve to themselves.
pub fn resolve_chains(entries: &IndexMap<String, CurationEntry>) -> IndexMap<String, ChainOutcome> {
    let index: HashMap<&str, usize> = entries
        .keys()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();
    let keys: Vec<&String> = entries.keys().collect();
    let targets: Vec<Option<&str>> = entries.values().map(|e| e.same_as_target()).collect();

    let mut state = vec![WalkState::Unvisited; entries.len()];

    for start in 0..entries.len() {
        if !matches!(state[start], WalkState::Unvisited) {
            continue;
        }

        let mut path = Vec::new();
        let mut current = start;
        let outcome = loop {
            let settled = match &state[current] {
                WalkState::Done(outcome) => Some(outcome.clone()),
                // Every earlier walk finished, so an on-path entry closes a loop.
                WalkState::OnPath => Some(ChainOutcome::Circular),
                WalkState::Unvisited => None,
            };
            if let Some(outcome) = settled {
                break outcome;
            }

            state[current] = WalkState::OnPath;
            path.push(current);
            match targets[current] {
                None => break ChainOutcome::Terminal(keys[current].clone()),
                Some(target) => match index.get(target) {
                    Some(&next) => current = next,
                    None => break ChainOutcome::Dangling(target.to_string()),
                },
            }
        };

        for visited in path {
            state[visited] = WalkState::Done(outcome.clone());
        }
    }

    keys.into_iter()
        .zip(state)
        .map(|(key, state)| match state {
            WalkState::Done(outcome) => (key.clone(), outcome),
            _ => (key.clone(), ChainOutcome::Circular),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(pairs: &[(&str, CurationEntry)]) -> IndexMap<String, CurationEntry> {
        pairs
            .iter()
            .map(|(k, e)| (k.to_string(), e.clone()))
            .collect()
    }

    #[test]
    fn test_two_cycle_is_circular_for_both() {
        let entries = scope(&[
            ("Bob", CurationEntry::same_as("Robert")),
            ("Robert", CurationEntry::same_as("Bob")),
        ]);
        let outcomes = resolve_chains(&entries);
        assert_eq!(outcomes["Bob"], ChainOutcome::Circular);
        assert_eq!(outcomes["Robert"], ChainOutcome::Circular);
    }

    #[test]
    fn test_self_loop_and_entry_into_cycle() {
        let entries = scope(&[
            ("A", CurationEntry::same_as("A")),
            ("X", CurationEntry::same_as("Y")),
            ("Y", CurationEntry::same_as("Z")),
            ("Z", CurationEntry::same_as("Y")),
        ]);
        let outcomes = resolve_chains(&entries);
        assert_eq!(outcomes["A"], ChainOutcome::Circular);
        assert_eq!(outcomes["X"], ChainOutcome::Circular);
        assert_eq!(outcomes["Z"], ChainOutcome::Circular);
    }

    #[test]
    fn test_long_chain_resolves_to_terminal() {
        let mut pairs: Vec<(String, CurationEntry)> = (0..10_000)
            .map(|i| (format!("n{i}"), CurationEntry::same_as(format!("n{}", i + 1))))
            .collect();
        pairs.push(("n10000".to_string(), CurationEntry::canonical(json!({"name": "N"}))));
        let entries: IndexMap<String, CurationEntry> = pairs.into_iter().collect();

        let outcomes = resolve_chains(&entries);
        assert_eq!(outcomes["n0"].terminal(), Some("n10000"));
        assert_eq!(outcomes["n10000"].terminal(), Some("n10000"));
    }

    #[test]
    fn test_dangling_target() {
        let entries = scope(&[
            ("Bobby", CurationEntry::same_as("Bob")),
            ("Rob", CurationEntry::same_as("Bobby")),
        ]);
        let outcomes = resolve_chains(&entries);
        assert_eq!(outcomes["Bobby"], ChainOutcome::Dangling("Bob".to_string()));
        assert_eq!(outcomes["Rob"], ChainOutcome::Dangling("Bob".to_string()));
    }

    #[test]
    fn test_malformed_alias_is_terminal() {
        let mut both = CurationEntry::same_as("Robert");
        both.skip = true;
        let entries = scope(&[("Bob", both), ("Robert", CurationEntry::skipped())]);
        let outcomes = resolve_chains(&entries);
        assert_eq!(outcomes["Bob"].terminal(), Some("Bob"));
    }
}
