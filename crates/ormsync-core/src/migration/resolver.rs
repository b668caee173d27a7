//! Dependency ordering of entities within one generation batch.
//!
//! An entity depends on another when it holds a `ManyToOne` to it and both
//! are in the batch. Kahn's algorithm orders dependencies first; ties keep
//! batch order. Entities caught in a cycle are appended in batch order and
//! reported, so their foreign keys to later tables are deferred.

use crate::catalog::EntityDescriptor;
use std::collections::{HashMap, VecDeque};

/// Result of ordering a batch.
#[derive(Debug, Clone)]
pub struct ResolvedOrder<'a> {
    /// Entities, dependencies first.
    pub entities: Vec<&'a EntityDescriptor>,
    /// Names of entities left unresolved because of a dependency cycle.
    pub cyclic: Vec<String>,
}

impl<'a> ResolvedOrder<'a> {
    /// Position of an entity (by identifier) in the resolved order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name == name)
    }

    /// Check if any cycle was found.
    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

/// Orders entities so referenced tables are created first.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Order a batch of entities.
    pub fn resolve(entities: &[EntityDescriptor]) -> ResolvedOrder<'_> {
        let index: HashMap<&str, usize> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.as_str(), i))
            .collect();

        // dependents[b] lists entities that must come after b.
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entities.len()];
        let mut in_degree = vec![0usize; entities.len()];

        for (i, entity) in entities.iter().enumerate() {
            let mut seen = Vec::new();
            for (_, target, _) in entity.many_to_one() {
                let Some(&j) = index.get(target) else {
                    continue;
                };
                // Self references and repeated targets add no ordering constraint.
                if j == i || seen.contains(&j) {
                    continue;
                }
                seen.push(j);
                dependents[j].push(i);
                in_degree[i] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..entities.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut placed = vec![false; entities.len()];
        let mut ordered = Vec::with_capacity(entities.len());

        while let Some(i) = queue.pop_front() {
            placed[i] = true;
            ordered.push(&entities[i]);
            for &d in &dependents[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    queue.push_back(d);
                }
            }
        }

        let mut cyclic = Vec::new();
        for (i, entity) in entities.iter().enumerate() {
            if !placed[i] {
                cyclic.push(entity.name.clone());
                ordered.push(entity);
            }
        }

        ResolvedOrder {
            entities: ordered,
            cyclic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationDescriptor;

    fn entity(name: &str) -> EntityDescriptor {
        EntityDescriptor::new(name, format!("{}s", name.to_lowercase())).with_id("id")
    }

    fn names(order: &ResolvedOrder<'_>) -> Vec<String> {
        order.entities.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_dependency_comes_first() {
        let batch = vec![
            entity("Post").with_relation(RelationDescriptor::many_to_one("author", "User", "author_id")),
            entity("User"),
        ];

        let order = DependencyResolver::resolve(&batch);
        assert_eq!(names(&order), vec!["User", "Post"]);
        assert!(!order.has_cycle());
        assert!(order.position("User") < order.position("Post"));
    }

    #[test]
    fn test_roots_keep_insertion_order() {
        let batch = vec![entity("C"), entity("A"), entity("B")];
        let order = DependencyResolver::resolve(&batch);
        assert_eq!(names(&order), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_chain() {
        let batch = vec![
            entity("Comment")
                .with_relation(RelationDescriptor::many_to_one("post", "Post", "post_id"))
                .with_relation(RelationDescriptor::many_to_one("author", "User", "author_id")),
            entity("Post").with_relation(RelationDescriptor::many_to_one("author", "User", "author_id")),
            entity("User"),
        ];

        let order = DependencyResolver::resolve(&batch);
        assert_eq!(names(&order), vec!["User", "Post", "Comment"]);
    }

    #[test]
    fn test_out_of_batch_targets_ignored() {
        let batch = vec![
            entity("Post").with_relation(RelationDescriptor::many_to_one("author", "User", "author_id")),
            entity("Tag"),
        ];
        let order = DependencyResolver::resolve(&batch);
        assert_eq!(names(&order), vec!["Post", "Tag"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let batch = vec![entity("Category")
            .with_relation(RelationDescriptor::many_to_one("parent", "Category", "parent_id"))];
        let order = DependencyResolver::resolve(&batch);
        assert!(!order.has_cycle());
        assert_eq!(order.entities.len(), 1);
    }

    #[test]
    fn test_cycle_is_appended_in_batch_order() {
        let batch = vec![
            entity("A").with_relation(RelationDescriptor::many_to_one("b", "B", "b_id")),
            entity("Root"),
            entity("B").with_relation(RelationDescriptor::many_to_one("a", "A", "a_id")),
        ];

        let order = DependencyResolver::resolve(&batch);
        assert_eq!(names(&order), vec!["Root", "A", "B"]);
        assert_eq!(order.cyclic, vec!["A", "B"]);
    }
}
