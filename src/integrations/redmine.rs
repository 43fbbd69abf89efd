use log::info;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    decode,
    http::{Credentials, Method, Request},
    issue_segment, list_limit, Error, Options, Tracker, TrackerKind,
};
use crate::{
    config::{self, Config},
    issues::{Issue, IssueId},
};

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct ParentRef {
    id: IssueId,
}

#[derive(Deserialize)]
struct ResponseIssue {
    id: IssueId,
    subject: String,
    tracker: Option<Named>,
    parent: Option<ParentRef>,
    status: Option<Named>,
    priority: Option<Named>,
    assigned_to: Option<Named>,
    project: Option<Named>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SingleIssue {
    issue: ResponseIssue,
}

#[derive(Deserialize)]
struct IssueList {
    issues: Vec<ResponseIssue>,
}

impl From<ResponseIssue> for Issue {
    fn from(response: ResponseIssue) -> Self {
        let name = |named: Option<Named>| named.map(|named| named.name);
        let tag = name(response.tracker);
        let mut issue = Issue::new(response.id, response.subject).with_tag(tag.as_deref());
        issue.parent = response.parent.map(|parent| parent.id);
        issue.status = name(response.status);
        issue.priority = name(response.priority);
        issue.assignee = name(response.assigned_to);
        issue.project = name(response.project);
        issue.description = response.description;
        issue
    }
}

/// A self-hosted Redmine server. It is never deduced from a remote, only chosen by config.
pub(crate) struct Redmine {
    url: String,
    credentials: Credentials,
}

impl Redmine {
    /// ## Errors
    /// If `[redmine] url` is not configured.
    pub(crate) fn new(config: &Config, credentials: Credentials) -> Result<Self, config::Error> {
        let url = config.require("redmine", "url")?.trim_end_matches('/').to_string();
        Ok(Self { url, credentials })
    }

    /// `--all-projects` beats `--project`, which beats `[redmine] project`.
    fn project<'a>(config: &'a Config, options: &'a Options) -> Option<&'a str> {
        if options.all_projects {
            None
        } else {
            options
                .project
                .as_deref()
                .or_else(|| config.get("redmine", "project"))
        }
    }
}

impl Tracker for Redmine {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Redmine
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn list_url(&self, config: &Config, options: &Options) -> Result<String, Error> {
        let limit = list_limit(config, options)?.to_string();
        let base = match Self::project(config, options) {
            Some(project) => format!("{}/projects/{project}/issues.json", self.url),
            None => format!("{}/issues.json", self.url),
        };
        let mut params = vec![("limit", limit.as_str())];
        if options.mine {
            params.push(("assigned_to_id", "me"));
        }
        if let Some(version) = &options.fixed_version {
            params.push(("fixed_version_id", version.as_str()));
        }
        if options.all {
            params.push(("status_id", "*"));
        }
        Url::parse_with_params(&base, &params)
            .map(String::from)
            .map_err(|err| Error::InvalidUrl {
                url: base,
                reason: err.to_string(),
            })
    }

    fn parse_list(&self, payload: Value) -> Result<Vec<Issue>, Error> {
        let list: IssueList = decode(self.kind(), payload)?;
        Ok(list.issues.into_iter().map(Issue::from).collect())
    }

    fn issue_url(&self, id: &str) -> Result<String, Error> {
        Ok(format!("{}/issues/{}.json", self.url, issue_segment(id)?))
    }

    fn parse_issue(&self, payload: Value) -> Result<Issue, Error> {
        let single: SingleIssue = decode(self.kind(), payload)?;
        Ok(single.issue.into())
    }

    fn take_request(&self, config: &Config, id: &str) -> Result<Request, Error> {
        let inprogress_id: u64 = config.require_as("redmine", "inprogress_id")?;
        let assignee_id: u64 = config.require_as("redmine", "assignee_id")?;
        let payload = json!({
            "issue": {
                "status_id": inprogress_id,
                "assigned_to_id": assignee_id,
            }
        });
        info!("Updating issue #{id}: {payload}");
        Ok(self
            .request(Method::PUT, self.issue_url(id)?)
            .header("content-type", "application/json")
            .json_body(&payload))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_redmine {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn config<'a>(extra: Vec<(&'a str, &'a str)>) -> Config {
        let mut values = vec![("url", "http://the_base_url/")];
        values.extend(extra);
        Config::from_sections([("redmine", values)])
    }

    fn tracker() -> Redmine {
        Redmine::new(&config(vec![]), Credentials::default()).unwrap()
    }

    fn query(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    fn path(url: &str) -> String {
        url.split('?').next().unwrap().to_string()
    }

    #[test]
    fn requires_url() {
        let err = Redmine::new(&Config::default(), Credentials::default())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Config missing: Section:'redmine', Option:'url'"
        );
    }

    #[test]
    fn never_matches_a_remote() {
        assert!(!TrackerKind::Redmine.matches_domain("redmine.org"));
    }

    #[test]
    fn list_url_defaults() {
        let url = tracker()
            .list_url(&config(vec![]), &Options::default())
            .unwrap();
        assert_eq!(path(&url), "http://the_base_url/issues.json");
        assert_eq!(query(&url), vec![(String::from("limit"), String::from("40"))]);
    }

    #[rstest]
    #[case::mine(Options { mine: true, ..Options::default() }, "assigned_to_id", "me")]
    #[case::version(Options { fixed_version: Some(String::from("v30")), ..Options::default() }, "fixed_version_id", "v30")]
    #[case::all(Options { all: true, ..Options::default() }, "status_id", "*")]
    fn list_filters(#[case] options: Options, #[case] key: &str, #[case] value: &str) {
        let url = tracker().list_url(&config(vec![]), &options).unwrap();
        assert!(query(&url).contains(&(key.to_string(), value.to_string())));
    }

    #[test]
    fn project_from_config() {
        let config = config(vec![("project", "configured")]);
        let url = tracker().list_url(&config, &Options::default()).unwrap();
        assert_eq!(path(&url), "http://the_base_url/projects/configured/issues.json");
    }

    #[test]
    fn project_option_beats_config() {
        let config = config(vec![("project", "configured")]);
        let options = Options {
            project: Some(String::from("chosen")),
            ..Options::default()
        };
        let url = tracker().list_url(&config, &options).unwrap();
        assert_eq!(path(&url), "http://the_base_url/projects/chosen/issues.json");
    }

    #[test]
    fn all_projects_beats_everything() {
        let config = config(vec![("project", "configured")]);
        let options = Options {
            project: Some(String::from("chosen")),
            all_projects: true,
            ..Options::default()
        };
        let url = tracker().list_url(&config, &options).unwrap();
        assert_eq!(path(&url), "http://the_base_url/issues.json");
    }

    #[test]
    fn issue_url() {
        assert_eq!(
            tracker().issue_url("the_issue").unwrap(),
            "http://the_base_url/issues/the_issue.json"
        );
    }

    #[test]
    fn parse_issue() {
        let issue = tracker()
            .parse_issue(json!({"issue": {
                "id": 12,
                "subject": "the subject",
                "tracker": {"id": 1, "name": "Bug"},
                "parent": {"id": 10},
                "status": {"id": 2, "name": "In Progress"},
                "priority": {"id": 4, "name": "Normal"},
                "assigned_to": {"id": 5, "name": "Someone"},
                "project": {"id": 6, "name": "the project"},
                "description": "the description",
            }}))
            .unwrap();
        assert_eq!(issue.id, IssueId::Number(12));
        assert_eq!(issue.title, "the subject");
        assert_eq!(issue.tag(), "Bug");
        assert_eq!(issue.parent, Some(IssueId::Number(10)));
        assert_eq!(issue.status.as_deref(), Some("In Progress"));
        assert_eq!(issue.priority.as_deref(), Some("Normal"));
        assert_eq!(issue.assignee.as_deref(), Some("Someone"));
        assert_eq!(issue.project.as_deref(), Some("the project"));
        assert_eq!(issue.description.as_deref(), Some("the description"));
    }

    #[test]
    fn parse_minimal_issue() {
        let issue = tracker()
            .parse_issue(json!({"issue": {"id": 1, "subject": "s"}}))
            .unwrap();
        assert_eq!(issue.tag(), "Issue");
        assert_eq!(issue.parent, None);
        assert_eq!(issue.status, None);
        assert_eq!(issue.assignee, None);
    }

    #[test]
    fn parse_list() {
        let issues = tracker()
            .parse_list(json!({"issues": [
                {"id": 1, "subject": "one"},
                {"id": 2, "subject": "two", "parent": {"id": 1}},
            ]}))
            .unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].parent, Some(IssueId::Number(1)));
    }

    #[test]
    fn take_request() {
        let config = config(vec![("inprogress_id", "2"), ("assignee_id", "5")]);
        let request = tracker().take_request(&config, "12").unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.url, "http://the_base_url/issues/12.json");
        assert_eq!(
            request.headers,
            vec![("content-type", String::from("application/json"))]
        );
        assert_eq!(
            serde_json::from_str::<Value>(request.body.as_deref().unwrap()).unwrap(),
            json!({"issue": {"status_id": 2, "assigned_to_id": 5}})
        );
    }

    #[test]
    fn take_ids_must_be_numbers() {
        let config = config(vec![("inprogress_id", "doing"), ("assignee_id", "5")]);
        let err = tracker().take_request(&config, "12").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config @ redmine:inprogress_id is not a u64"
        );
    }

    #[rstest]
    #[case::no_inprogress(vec![("assignee_id", "5")], "inprogress_id")]
    #[case::no_assignee(vec![("inprogress_id", "2")], "assignee_id")]
    fn take_requires_ids(#[case] extra: Vec<(&str, &str)>, #[case] missing: &str) {
        let err = tracker().take_request(&config(extra), "12").unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Config missing: Section:'redmine', Option:'{missing}'")
        );
    }
}
