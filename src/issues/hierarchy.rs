use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use super::{Issue, IssueId};

/// A flat batch of issues arranged by their parent links.
///
/// Issues are owned in one id-indexed map; parent/child edges are stored as ids so that an issue
/// is never reachable as both a root and a child. An issue whose parent is not part of the batch
/// (e.g. it fell outside the list limit) is a root.
#[derive(Debug, Default)]
pub(crate) struct IssueForest {
    issues: IndexMap<IssueId, Issue>,
    children: HashMap<IssueId, BTreeSet<IssueId>>,
    roots: BTreeSet<IssueId>,
}

impl IssueForest {
    /// Arrange `issues` into a forest. When two issues share an id, the later one wins.
    pub(crate) fn build(issues: impl IntoIterator<Item = Issue>) -> Self {
        let issues: IndexMap<IssueId, Issue> = issues
            .into_iter()
            .map(|issue| (issue.id.clone(), issue))
            .collect();

        let mut children: HashMap<IssueId, BTreeSet<IssueId>> = HashMap::new();
        let mut roots = BTreeSet::new();
        for (id, issue) in &issues {
            match &issue.parent {
                Some(parent) if parent != id && issues.contains_key(parent) => {
                    children.entry(parent.clone()).or_default().insert(id.clone());
                }
                _ => {
                    roots.insert(id.clone());
                }
            }
        }

        Self {
            issues,
            children,
            roots,
        }
    }

    /// The total number of issues in the forest, at any depth.
    pub(crate) fn len(&self) -> usize {
        self.issues.len()
    }

    /// Top-level issues, by ascending id.
    pub(crate) fn roots(&self) -> impl DoubleEndedIterator<Item = &Issue> {
        self.roots.iter().filter_map(|id| self.issues.get(id))
    }

    /// Direct children of `id`, by ascending id.
    pub(crate) fn children(&self, id: &IssueId) -> impl Iterator<Item = &Issue> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.issues.get(child))
    }

    /// Every reachable issue with its depth, depth-first with siblings by ascending id.
    pub(crate) fn walk(&self) -> Vec<(usize, &Issue)> {
        let mut ordered = Vec::with_capacity(self.issues.len());
        let mut stack: Vec<(usize, &Issue)> = self.roots().rev().map(|issue| (0, issue)).collect();
        while let Some((depth, issue)) = stack.pop() {
            ordered.push((depth, issue));
            let children: Vec<&Issue> = self.children(&issue.id).collect();
            stack.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
        }
        ordered
    }
}
