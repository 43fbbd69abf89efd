use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    decode,
    http::{Credentials, Method, Request},
    issue_segment, list_limit, Error, Options, RepoData, Tracker, TrackerKind,
};
use crate::{
    config::{self, Config},
    issues::Issue,
};

const API_URL: &str = "https://api.github.com";
const VALID_TAGS: [&str; 5] = ["bug", "enhancement", "documentation", "feature", "new feature"];
const PRIORITY_PREFIX: &str = "priority:";

#[derive(Deserialize)]
struct ResponseIssue {
    number: u64,
    title: String,
    body: Option<String>,
    assignee: Option<ResponseUser>,
    #[serde(default)]
    labels: Vec<ResponseLabel>,
}

#[derive(Deserialize)]
struct ResponseUser {
    login: String,
}

#[derive(Deserialize)]
struct ResponseLabel {
    name: String,
}

impl From<ResponseIssue> for Issue {
    fn from(response: ResponseIssue) -> Self {
        let labels: Vec<&str> = response.labels.iter().map(|label| label.name.as_str()).collect();
        let mut issue = Issue::new(response.number, response.title).with_tag(first_valid_tag(&labels));
        issue.description = response.body;
        issue.assignee = response.assignee.map(|assignee| assignee.login);
        issue.priority = labels.iter().rev().find_map(|label| priority(label)).map(String::from);
        issue
    }
}

/// The first label that names a known kind of issue, keeping its original case.
fn first_valid_tag<'a>(labels: &[&'a str]) -> Option<&'a str> {
    labels
        .iter()
        .copied()
        .find(|label| VALID_TAGS.contains(&label.to_lowercase().as_str()))
}

fn priority(label: &str) -> Option<&str> {
    let prefix = label.get(..PRIORITY_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(PRIORITY_PREFIX) {
        label.get(PRIORITY_PREFIX.len()..)
    } else {
        None
    }
}

pub(crate) struct GitHub {
    repo: RepoData,
    credentials: Credentials,
}

impl GitHub {
    pub(crate) fn new(repo: RepoData, credentials: Credentials) -> Self {
        let repository = repo
            .repository
            .map(|name| name.strip_suffix(".git").map(String::from).unwrap_or(name));
        Self {
            repo: RepoData {
                owner: repo.owner,
                repository,
            },
            credentials,
        }
    }

    fn issues_url(&self) -> Result<String, config::Error> {
        let (owner, repository) = self.repo.require(TrackerKind::GitHub)?;
        Ok(format!("{API_URL}/repos/{owner}/{repository}/issues"))
    }
}

impl Tracker for GitHub {
    fn kind(&self) -> TrackerKind {
        TrackerKind::GitHub
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn request(&self, method: Method, url: String) -> Request {
        Request::new(method, url, &self.credentials).header("Accept", "application/vnd.github+json")
    }

    fn list_url(&self, config: &Config, options: &Options) -> Result<String, Error> {
        let limit = list_limit(config, options)?;
        Ok(format!("{}?per_page={limit}", self.issues_url()?))
    }

    fn parse_list(&self, payload: Value) -> Result<Vec<Issue>, Error> {
        let issues: Vec<ResponseIssue> = decode(self.kind(), payload)?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    fn issue_url(&self, id: &str) -> Result<String, Error> {
        Ok(format!("{}/{}", self.issues_url()?, issue_segment(id)?))
    }

    fn parse_issue(&self, payload: Value) -> Result<Issue, Error> {
        let issue: ResponseIssue = decode(self.kind(), payload)?;
        Ok(issue.into())
    }

    fn take_request(&self, _config: &Config, id: &str) -> Result<Request, Error> {
        let user = self
            .credentials
            .user
            .as_deref()
            .ok_or_else(|| config::Error::missing("auth", "user"))?;
        let url = self.issue_url(id)?;
        Ok(self
            .request(Method::PATCH, url)
            .json_body(&json!({ "assignee": user })))
    }
}
