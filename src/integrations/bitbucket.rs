use serde::Deserialize;
use serde_json::Value;

use super::{
    decode, http::Credentials, issue_segment, list_limit, Error, Options, RepoData, Tracker,
    TrackerKind,
};
use crate::{
    config::{self, Config},
    issues::{Issue, IssueId},
};

const API_URL: &str = "https://bitbucket.org/api/1.0";

#[derive(Deserialize)]
struct ResponseIssue {
    local_id: IssueId,
    title: String,
    content: Option<String>,
}

#[derive(Deserialize)]
struct ResponseList {
    issues: Vec<ResponseIssue>,
}

impl From<ResponseIssue> for Issue {
    fn from(response: ResponseIssue) -> Self {
        let mut issue = Issue::new(response.local_id, response.title);
        issue.description = response.content;
        issue
    }
}

/// Bitbucket's v1 issue API. Issues can be listed and fetched but not assigned.
pub(crate) struct Bitbucket {
    repo: RepoData,
    credentials: Credentials,
}

impl Bitbucket {
    pub(crate) fn new(repo: RepoData, credentials: Credentials) -> Self {
        Self { repo, credentials }
    }

    fn issues_url(&self) -> Result<String, config::Error> {
        let (owner, repository) = self.repo.require(TrackerKind::Bitbucket)?;
        Ok(format!("{API_URL}/repositories/{owner}/{repository}/issues"))
    }
}

impl Tracker for Bitbucket {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Bitbucket
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn list_url(&self, config: &Config, options: &Options) -> Result<String, Error> {
        let limit = list_limit(config, options)?;
        Ok(format!("{}?limit={limit}", self.issues_url()?))
    }

    fn parse_list(&self, payload: Value) -> Result<Vec<Issue>, Error> {
        let list: ResponseList = decode(self.kind(), payload)?;
        Ok(list.issues.into_iter().map(Issue::from).collect())
    }

    fn issue_url(&self, id: &str) -> Result<String, Error> {
        Ok(format!("{}/{}", self.issues_url()?, issue_segment(id)?))
    }

    fn parse_issue(&self, payload: Value) -> Result<Issue, Error> {
        let issue: ResponseIssue = decode(self.kind(), payload)?;
        Ok(issue.into())
    }
}
