use std::fmt;

use serde::Deserialize;

use crate::format::{colorize, green, magenta};

mod hierarchy;

pub(crate) use hierarchy::IssueForest;

/// Identifies an issue within one tracker. GitHub and Redmine use numbers, but nothing else
/// about the id is assumed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub(crate) enum IssueId {
    Number(u64),
    Text(String),
}

impl From<&str> for IssueId {
    fn from(value: &str) -> Self {
        value
            .parse()
            .map_or_else(|_| Self::Text(value.to_string()), Self::Number)
    }
}

impl From<u64> for IssueId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

/// A single work item, as reported by any tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Issue {
    pub(crate) id: IssueId,
    pub(crate) title: String,
    tag: String,
    pub(crate) parent: Option<IssueId>,
    pub(crate) priority: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) assignee: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) description: Option<String>,
}

impl Issue {
    pub(crate) const DEFAULT_TAG: &'static str = "Issue";

    pub(crate) fn new(id: impl Into<IssueId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tag: Self::DEFAULT_TAG.to_string(),
            parent: None,
            priority: None,
            status: None,
            assignee: None,
            project: None,
            description: None,
        }
    }

    pub(crate) fn tag(&self) -> &str {
        &self.tag
    }

    /// Set the category of the issue. A missing or empty tag means [`Issue::DEFAULT_TAG`].
    pub(crate) fn set_tag(&mut self, tag: Option<&str>) {
        self.tag = match tag {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => Self::DEFAULT_TAG.to_string(),
        };
    }

    #[must_use]
    pub(crate) fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.set_tag(tag);
        self
    }

    /// The raw text a branch name is derived from.
    pub(crate) fn branch(&self) -> String {
        format!("{}-{}-{}", self.tag, self.id, self.title)
    }

    /// A single colored line describing the issue for lists.
    pub(crate) fn text(&self) -> String {
        let labels = [self.priority.as_deref(), self.status.as_deref()]
            .into_iter()
            .flatten()
            .map(|label| colorize(label, label))
            .collect::<Vec<_>>();
        let status = if labels.is_empty() {
            String::new()
        } else {
            format!(" [{}] -", labels.join("/"))
        };
        let project = self
            .project
            .as_ref()
            .map(|project| magenta(&format!(" {{{project}}}")))
            .unwrap_or_default();
        let tag = colorize(&format!(" {}: ", self.tag), &self.tag);
        let assignee = self
            .assignee
            .as_ref()
            .map(|assignee| format!(" - {}", green(&format!("({assignee})"))))
            .unwrap_or_default();
        format!(
            "{id} -{status}{project}{tag}{title}{assignee}",
            id = self.id,
            title = self.title
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.title)
    }
}
