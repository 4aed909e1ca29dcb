//! Draft clustering of raw mentions into candidate identities.
//!
//! Two raw names are linked when their keys are equal, or when their keys
//! are one edit apart and differ in length by at most one. Connected
//! components become draft groups for a curator to review; nothing
//! downstream reads them.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::curation::EntityKind;
use crate::mention::{Occurrence, ParsedPerson, RawMention, base_name, parse_location, parse_person};
use crate::normalize::normalize;

/// Disjoint-set forest over `0..n`.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Representative of `x`'s set, compressing the path walked.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Members of each set, sets ordered by their smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for x in 0..self.parent.len() {
            let root = self.find(x);
            by_root.entry(root).or_default().push(x);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        groups.sort_by_key(|g| g[0]);
        groups
    }
}

/// Best guess at a group's canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalGuess {
    /// First name, or location name.
    pub name: String,
    /// Last name, when one was seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
}

/// One raw name inside a draft group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Raw name as written.
    pub name: String,
    /// Number of occurrences.
    pub total_count: usize,
    /// First and last occurrence dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<[String; 2]>,
    /// A few occurrences for context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_occurrences: Vec<Occurrence>,
}

/// A draft candidate identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    /// Group identifier, stable for identical input.
    pub id: String,
    /// Raw names in the group.
    pub members: Vec<GroupMember>,
    /// Suggested canonical.
    pub canonical: CanonicalGuess,
}

/// Groups raw mentions by fuzzy name equality.
#[derive(Debug, Clone)]
pub struct Clusterer {
    max_distance: usize,
    max_length_delta: usize,
    sample_size: usize,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self {
            max_distance: 1,
            max_length_delta: 1,
            sample_size: 3,
        }
    }
}

/// A distinct raw name with all of its occurrences.
struct Node {
    raw_name: String,
    key: String,
    occurrences: Vec<Occurrence>,
}

impl Clusterer {
    /// Create a clusterer with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum edit distance between linked keys.
    pub fn with_max_distance(mut self, distance: usize) -> Self {
        self.max_distance = distance;
        self
    }

    /// Set how many sample occurrences each member keeps.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Cluster the mentions of one scope.
    ///
    /// Output is independent of the order of `mentions`.
    pub fn cluster(&self, kind: EntityKind, mentions: &[RawMention]) -> Vec<EntityGroup> {
        let nodes = collect_nodes(kind, mentions);

        let mut sets = UnionFind::new(nodes.len());
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if self.linked(&nodes[i].key, &nodes[j].key) {
                    sets.union(i, j);
                }
            }
        }

        sets.components()
            .into_iter()
            .enumerate()
            .map(|(i, members)| {
                let members: Vec<&Node> = members.into_iter().map(|m| &nodes[m]).collect();
                EntityGroup {
                    id: format!("group-{:03}", i + 1),
                    canonical: guess_canonical(kind, &members),
                    members: members.iter().map(|n| self.member(n)).collect(),
                }
            })
            .collect()
    }

    /// Cluster location mentions city by city.
    pub fn cluster_by_city(
        &self,
        by_city: &IndexMap<String, Vec<RawMention>>,
    ) -> IndexMap<String, Vec<EntityGroup>> {
        by_city
            .iter()
            .map(|(city, mentions)| (city.clone(), self.cluster(EntityKind::Locations, mentions)))
            .collect()
    }

    /// Whether two grouping keys belong together.
    pub fn linked(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let (la, lb) = (a.chars().count(), b.chars().count());
        la.abs_diff(lb) <= self.max_length_delta && strsim::levenshtein(a, b) <= self.max_distance
    }

    fn member(&self, node: &Node) -> GroupMember {
        let first = node.occurrences.iter().map(|o| o.date).min();
        let last = node.occurrences.iter().map(|o| o.date).max();
        let mut samples = node.occurrences.clone();
        samples.sort_by_key(|o| o.date);
        samples.truncate(self.sample_size);

        GroupMember {
            name: node.raw_name.clone(),
            total_count: node.occurrences.len(),
            date_range: first.zip(last).map(|(f, l)| [f.to_string(), l.to_string()]),
            sample_occurrences: samples,
        }
    }
}

/// Grouping key for a raw name.
///
/// People written with `@alias` group by the alias alone, so
/// `@Majo (María-José Castro)` and `@Majo` share a key.
pub fn grouping_key(kind: EntityKind, raw_name: &str) -> String {
    match kind {
        EntityKind::People => match parse_person(raw_name).alias {
            Some(alias) => normalize(&alias),
            None => normalize(raw_name),
        },
        EntityKind::Locations => normalize(raw_name),
    }
}

/// Merge mentions sharing a raw name and order nodes deterministically.
fn collect_nodes(kind: EntityKind, mentions: &[RawMention]) -> Vec<Node> {
    let mut by_name: BTreeMap<&str, Vec<Occurrence>> = BTreeMap::new();
    for mention in mentions {
        by_name
            .entry(mention.raw_name.as_str())
            .or_default()
            .extend(mention.occurrences.iter().cloned());
    }

    let mut nodes: Vec<Node> = by_name
        .into_iter()
        .map(|(raw_name, mut occurrences)| {
            occurrences.sort_by(|a, b| {
                (a.date, a.context, &a.context_name).cmp(&(b.date, b.context, &b.context_name))
            });
            Node {
                raw_name: raw_name.to_string(),
                key: grouping_key(kind, raw_name),
                occurrences,
            }
        })
        .collect();

    nodes.sort_by(|a, b| (&a.key, &a.raw_name).cmp(&(&b.key, &b.raw_name)));
    nodes
}

fn guess_canonical(kind: EntityKind, members: &[&Node]) -> CanonicalGuess {
    if kind == EntityKind::People {
        let detailed: Option<ParsedPerson> = members
            .iter()
            .map(|n| parse_person(&n.raw_name))
            .filter(|p| p.expansion.is_some() || p.last_name.is_some())
            .max_by_key(|p| (p.detail(), Reverse(p.full_name())));

        if let Some(person) = detailed {
            return CanonicalGuess {
                name: person.first_name,
                lastname: person.last_name,
            };
        }
    }

    let most_common = members
        .iter()
        .max_by_key(|n| (n.occurrences.len(), Reverse(n.raw_name.clone())))
        .map(|n| n.raw_name.clone())
        .unwrap_or_default();

    let name = match kind {
        EntityKind::People => base_name(most_common.trim_start_matches('@')),
        EntityKind::Locations => base_name(&parse_location(&most_common)),
    };

    CanonicalGuess { name, lastname: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::ContextType;
    use chrono::NaiveDate;

    fn mention(raw: &str, count: usize) -> RawMention {
        let mut m = RawMention::new(raw, 2024);
        for day in 0..count {
            m = m.with_occurrence(Occurrence {
                date: NaiveDate::from_ymd_opt(2024, 1, 1 + day as u32).unwrap(),
                context: ContextType::Scene,
                context_name: format!("scene {day}"),
                city: None,
            });
        }
        m
    }

    fn member_names(group: &EntityGroup) -> Vec<&str> {
        group.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_union_find() {
        let mut sets = UnionFind::new(5);
        assert!(sets.union(0, 3));
        assert!(sets.union(3, 4));
        assert!(!sets.union(0, 4));
        assert_eq!(sets.components(), vec![vec![0, 3, 4], vec![1], vec![2]]);
    }

    #[test]
    fn test_alias_syntax_groups_by_alias() {
        let groups = Clusterer::new().cluster(
            EntityKind::People,
            &[mention("@Majo (María-José Castro)", 1), mention("@Majo", 4), mention("Majo", 1)],
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(groups[0].canonical.name, "María-José");
        assert_eq!(groups[0].canonical.lastname.as_deref(), Some("Castro"));
    }

    #[test]
    fn test_one_edit_links_names() {
        let groups = Clusterer::new().cluster(
            EntityKind::People,
            &[mention("Sofia", 3), mention("Sofía", 1), mention("Sophia", 1), mention("Bob", 2)],
        );
        let names: Vec<Vec<&str>> = groups.iter().map(member_names).collect();
        // "sofia" and "sophia" are two edits apart.
        assert!(names.contains(&vec!["Bob"]));
        assert!(names.contains(&vec!["Sofia", "Sofía"]));
        assert!(names.contains(&vec!["Sophia"]));
    }

    #[test]
    fn test_length_guard() {
        let clusterer = Clusterer::new();
        assert!(clusterer.linked("ana", "anna"));
        assert!(!clusterer.linked("al", "alex"));
        assert!(clusterer.linked("jo", "jo"));
    }

    #[test]
    fn test_fallback_guess_strips_parenthetical() {
        let groups = Clusterer::new().cluster(
            EntityKind::People,
            &[mention("Alice (Work)", 5), mention("Alice (work)", 1)],
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical, CanonicalGuess { name: "Alice".to_string(), lastname: None });
    }

    #[test]
    fn test_members_carry_counts_and_ranges() {
        let clusterer = Clusterer::new().with_sample_size(2);
        let groups = clusterer.cluster(EntityKind::Locations, &[mention("#Parc_Jarry", 4)]);
        let member = &groups[0].members[0];
        assert_eq!(member.total_count, 4);
        assert_eq!(
            member.date_range,
            Some(["2024-01-01".to_string(), "2024-01-04".to_string()])
        );
        assert_eq!(member.sample_occurrences.len(), 2);
        assert_eq!(groups[0].canonical.name, "Parc Jarry");
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let forward = vec![mention("Bob", 1), mention("Bobb", 1), mention("Rob", 2), mention("Zed", 1)];
        let mut backward = forward.clone();
        backward.reverse();

        let clusterer = Clusterer::new();
        assert_eq!(
            clusterer.cluster(EntityKind::People, &forward),
            clusterer.cluster(EntityKind::People, &backward)
        );
    }
}
