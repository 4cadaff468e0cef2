//! Dependency graph over entity ids.
//!
//! Nodes live in an arena (`Vec`) with a side map from id to index; edges are
//! index lists. Built fresh from a snapshot wherever validation or traversal
//! is needed, which keeps the persistent format free of derived data.

use crate::error::{Result, StewardError};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

pub struct DepGraph<I> {
    ids: Vec<I>,
    index: HashMap<I, usize>,
    /// edges[i] lists the nodes i depends on.
    edges: Vec<Vec<usize>>,
    /// reverse[i] lists the nodes that depend on i.
    reverse: Vec<Vec<usize>>,
}

impl<I: Copy + Eq + Hash + Display> DepGraph<I> {
    pub fn new(ids: impl IntoIterator<Item = I>) -> Self {
        let ids: Vec<I> = ids.into_iter().collect();
        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let edges = vec![Vec::new(); ids.len()];
        let reverse = vec![Vec::new(); ids.len()];
        Self {
            ids,
            index,
            edges,
            reverse,
        }
    }

    pub fn contains(&self, id: I) -> bool {
        self.index.contains_key(&id)
    }

    /// Record `from` depends on `to`. Both endpoints must be known nodes.
    pub fn add_edge(&mut self, from: I, to: I) -> Result<()> {
        let (Some(&f), Some(&t)) = (self.index.get(&from), self.index.get(&to)) else {
            return Err(StewardError::UnknownDependency {
                from: from.to_string(),
                to: to.to_string(),
            });
        };
        if !self.edges[f].contains(&t) {
            self.edges[f].push(t);
            self.reverse[t].push(f);
        }
        Ok(())
    }

    /// First cycle found, as the id path that closes it, or `None`.
    pub fn find_cycle(&self) -> Option<Vec<I>> {
        fn visit(
            edges: &[Vec<usize>],
            node: usize,
            visited: &mut [bool],
            on_stack: &mut [bool],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            if on_stack[node] {
                let start = path.iter().position(|&n| n == node).unwrap();
                let mut cycle = path[start..].to_vec();
                cycle.push(node);
                return Some(cycle);
            }
            if visited[node] {
                return None;
            }
            visited[node] = true;
            on_stack[node] = true;
            path.push(node);
            for &dep in &edges[node] {
                if let Some(cycle) = visit(edges, dep, visited, on_stack, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            on_stack[node] = false;
            None
        }

        let mut visited = vec![false; self.ids.len()];
        let mut on_stack = vec![false; self.ids.len()];
        let mut path = Vec::new();
        for node in 0..self.ids.len() {
            if let Some(cycle) = visit(&self.edges, node, &mut visited, &mut on_stack, &mut path) {
                return Some(cycle.into_iter().map(|i| self.ids[i]).collect());
            }
        }
        None
    }

    /// Error with the offending path when the graph has a cycle.
    pub fn validate_acyclic(&self) -> Result<()> {
        if let Some(cycle) = self.find_cycle() {
            let path = cycle
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(StewardError::DependencyCycle(path));
        }
        Ok(())
    }

    /// Everything that transitively depends on `of`, breadth-first, `of`
    /// excluded.
    pub fn transitive_dependents(&self, of: I) -> Vec<I> {
        let Some(&start) = self.index.get(&of) else {
            return Vec::new();
        };
        let mut seen = vec![false; self.ids.len()];
        let mut queue = std::collections::VecDeque::from([start]);
        let mut out = Vec::new();
        seen[start] = true;
        while let Some(node) = queue.pop_front() {
            for &dep in &self.reverse[node] {
                if !seen[dep] {
                    seen[dep] = true;
                    out.push(self.ids[dep]);
                    queue.push_back(dep);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TaskId;

    fn t(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn graph(ids: &[&str]) -> DepGraph<TaskId> {
        DepGraph::new(ids.iter().map(|s| t(s)))
    }

    #[test]
    fn acyclic_diamond_passes() {
        let mut g = graph(&["E1.1", "E1.2", "E1.3", "E1.4"]);
        g.add_edge(t("E1.2"), t("E1.1")).unwrap();
        g.add_edge(t("E1.3"), t("E1.1")).unwrap();
        g.add_edge(t("E1.4"), t("E1.2")).unwrap();
        g.add_edge(t("E1.4"), t("E1.3")).unwrap();
        g.validate_acyclic().unwrap();
    }

    #[test]
    fn self_loop_detected() {
        let mut g = graph(&["E1.1"]);
        g.add_edge(t("E1.1"), t("E1.1")).unwrap();
        let err = g.validate_acyclic().unwrap_err();
        assert_eq!(err.code(), "dependency_cycle");
        assert!(err.to_string().contains("E1.1 -> E1.1"));
    }

    #[test]
    fn indirect_cycle_detected_with_path() {
        let mut g = graph(&["E1.1", "E1.2", "E1.3"]);
        g.add_edge(t("E1.1"), t("E1.2")).unwrap();
        g.add_edge(t("E1.2"), t("E1.3")).unwrap();
        g.add_edge(t("E1.3"), t("E1.1")).unwrap();
        let err = g.validate_acyclic().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("E1.1"));
        assert!(msg.contains("E1.3"));
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let mut g = graph(&["E1.1"]);
        let err = g.add_edge(t("E1.1"), t("E1.9")).unwrap_err();
        assert_eq!(err.code(), "unknown_dependency");
        assert!(err.to_string().contains("E1.9"));
    }

    #[test]
    fn transitive_dependents_walk_reverse_edges() {
        let mut g = graph(&["E1.1", "E1.2", "E1.3", "E1.4", "E1.5"]);
        // 2 and 3 depend on 1; 4 depends on 3; 5 is unrelated
        g.add_edge(t("E1.2"), t("E1.1")).unwrap();
        g.add_edge(t("E1.3"), t("E1.1")).unwrap();
        g.add_edge(t("E1.4"), t("E1.3")).unwrap();
        let deps = g.transitive_dependents(t("E1.1"));
        assert_eq!(deps.len(), 3);
        assert!(deps.contains(&t("E1.2")));
        assert!(deps.contains(&t("E1.3")));
        assert!(deps.contains(&t("E1.4")));
        assert!(!deps.contains(&t("E1.5")));
        assert!(g.transitive_dependents(t("E1.5")).is_empty());
    }

    #[test]
    fn duplicate_edges_ignored() {
        let mut g = graph(&["E1.1", "E1.2"]);
        g.add_edge(t("E1.2"), t("E1.1")).unwrap();
        g.add_edge(t("E1.2"), t("E1.1")).unwrap();
        assert_eq!(g.transitive_dependents(t("E1.1")), vec![t("E1.2")]);
    }
}
