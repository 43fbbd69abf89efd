use std::fmt;

use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{config, config::Config, issues::Issue, remote::RemoteDescriptor};

pub(crate) mod bitbucket;
pub(crate) mod git;
pub(crate) mod github;
pub(crate) mod http;
pub(crate) mod redmine;
pub(crate) mod resolve;

use http::{Credentials, Gateway, Method, Request};

/// How many issues to list when neither the command line nor the config say.
pub(crate) const DEFAULT_LIST_LIMIT: i64 = 40;

/// Per-run choices from the command line that shape tracker requests.
#[derive(Clone, Debug, Default)]
pub(crate) struct Options {
    pub(crate) limit: Option<i64>,
    pub(crate) mine: bool,
    pub(crate) fixed_version: Option<String>,
    pub(crate) all: bool,
    pub(crate) project: Option<String>,
    pub(crate) all_projects: bool,
    pub(crate) user: Option<String>,
    pub(crate) password: Option<String>,
}

/// The list size for this run: `--limit`, else `[list] limit`, else [`DEFAULT_LIST_LIMIT`].
pub(crate) fn list_limit(config: &Config, options: &Options) -> Result<i64, Error> {
    let limit = match options.limit {
        Some(limit) => limit,
        None => config
            .get_as("list", "limit")?
            .unwrap_or(DEFAULT_LIST_LIMIT),
    };
    if limit <= 0 {
        return Err(Error::InvalidLimit(limit));
    }
    Ok(limit)
}

/// The fixed set of services issue2branch can talk to, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TrackerKind {
    GitHub,
    Bitbucket,
    Redmine,
}

impl TrackerKind {
    pub(crate) const ALL: [Self; 3] = [Self::GitHub, Self::Bitbucket, Self::Redmine];

    /// The name used for `[main] tracker` and for the tracker's own config section.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Bitbucket => "bitbucket",
            Self::Redmine => "redmine",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Whether a remote hosted at `domain` belongs to this service.
    pub(crate) fn matches_domain(self, domain: &str) -> bool {
        match self {
            Self::GitHub => domain.contains("github.com"),
            Self::Bitbucket => domain.contains("bitbucket.org"),
            Self::Redmine => false,
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
            Self::Bitbucket => write!(f, "Bitbucket"),
            Self::Redmine => write!(f, "Redmine"),
        }
    }
}

/// Repository coordinates on a hosted service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RepoData {
    pub(crate) owner: Option<String>,
    pub(crate) repository: Option<String>,
}

impl RepoData {
    /// The `repo_user` / `repo_name` overrides from the tracker's config section.
    pub(crate) fn from_config(config: &Config, kind: TrackerKind) -> Self {
        Self {
            owner: config.get(kind.name(), "repo_user").map(String::from),
            repository: config.get(kind.name(), "repo_name").map(String::from),
        }
    }

    /// Fill whatever the config left out from the parsed remote.
    #[must_use]
    pub(crate) fn or_remote(self, remote: Option<&RemoteDescriptor>) -> Self {
        Self {
            owner: self
                .owner
                .or_else(|| remote.map(|remote| remote.owner.clone())),
            repository: self
                .repository
                .or_else(|| remote.map(|remote| remote.repository.clone())),
        }
    }

    /// ## Errors
    /// [`config::Error::Missing`] naming the override that would have provided the missing part.
    pub(crate) fn require(&self, kind: TrackerKind) -> Result<(&str, &str), config::Error> {
        let owner = self
            .owner
            .as_deref()
            .ok_or_else(|| config::Error::missing(kind.name(), "repo_user"))?;
        let repository = self
            .repository
            .as_deref()
            .ok_or_else(|| config::Error::missing(kind.name(), "repo_name"))?;
        Ok((owner, repository))
    }
}

/// An optional feature a tracker might not have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Capability {
    List,
    Take,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "Issue list"),
            Self::Take => write!(f, "Issue taking"),
        }
    }
}

/// One issue tracking service, already bound to a repository or server and a login.
///
/// Implementors build URLs and turn payloads into [`Issue`]s; the provided methods do the
/// requests through a [`Gateway`], which is where status codes are checked.
pub(crate) trait Tracker {
    fn kind(&self) -> TrackerKind;

    fn credentials(&self) -> &Credentials;

    /// ## Errors
    /// [`Error::NotSupported`] unless the tracker can list issues.
    fn list_url(&self, _config: &Config, _options: &Options) -> Result<String, Error> {
        Err(self.not_supported(Capability::List))
    }

    fn parse_list(&self, payload: Value) -> Result<Vec<Issue>, Error>;

    fn issue_url(&self, id: &str) -> Result<String, Error>;

    fn parse_issue(&self, payload: Value) -> Result<Issue, Error>;

    /// The request that assigns `id` to the current user.
    ///
    /// ## Errors
    /// [`Error::NotSupported`] unless the tracker can assign issues.
    fn take_request(&self, _config: &Config, _id: &str) -> Result<Request, Error> {
        Err(self.not_supported(Capability::Take))
    }

    /// Start a request to this tracker, authenticated if there is a user.
    fn request(&self, method: Method, url: String) -> Request {
        Request::new(method, url, self.credentials())
    }

    fn not_supported(&self, capability: Capability) -> Error {
        Error::NotSupported {
            tracker: self.kind(),
            capability,
        }
    }

    fn list_issues(
        &self,
        gateway: &mut Gateway,
        config: &Config,
        options: &Options,
    ) -> Result<Vec<Issue>, Error> {
        let url = self.list_url(config, options)?;
        let payload = gateway.fetch_json(&self.request(Method::GET, url))?;
        self.parse_list(payload)
    }

    fn get_issue(&self, gateway: &mut Gateway, id: &str) -> Result<Issue, Error> {
        let url = self.issue_url(id)?;
        let payload = gateway.fetch_json(&self.request(Method::GET, url))?;
        self.parse_issue(payload)
    }

    fn take_issue(&self, gateway: &mut Gateway, config: &Config, id: &str) -> Result<(), Error> {
        let request = self.take_request(config, id)?;
        gateway.send(&request)?;
        Ok(())
    }
}

/// `id` checked to be usable as a single URL path segment.
///
/// ## Errors
/// If `id` is empty or has anything but ASCII letters, digits, `-` or `_`.
fn issue_segment(id: &str) -> Result<&str, Error> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(Error::InvalidIssueId(id.to_string()))
    }
}

/// Decode one payload shape of `tracker`.
fn decode<T: DeserializeOwned>(tracker: TrackerKind, payload: Value) -> Result<T, Error> {
    serde_json::from_value(payload).map_err(|source| Error::UnexpectedResponse { tracker, source })
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error("List limit must be positive: {0}")]
    #[diagnostic(
        code(integrations::invalid_limit),
        help("Pass a --limit above zero, or fix `limit` under [list] in .issue2branch.toml")
    )]
    InvalidLimit(i64),
    #[error("{capability} is not implemented for {tracker}")]
    #[diagnostic(code(integrations::not_supported))]
    NotSupported {
        tracker: TrackerKind,
        capability: Capability,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] http::Error),
    #[error("Received unexpected data from {tracker}: {source}")]
    #[diagnostic(
        code(integrations::unexpected_response),
        help("It's possible {tracker} has updated their API, please report this issue")
    )]
    UnexpectedResponse {
        tracker: TrackerKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid tracker URL '{url}': {reason}")]
    #[diagnostic(code(integrations::invalid_url), help("Check `url` under [redmine]"))]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid issue id: '{0}'")]
    #[diagnostic(
        code(integrations::invalid_issue_id),
        help("Issue ids are made of letters, digits, `-` and `_`, like `12`")
    )]
    InvalidIssueId(String),
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_issue_segment {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("12")]
    #[case("PRJ-12")]
    #[case("the_issue")]
    fn accepted(#[case] id: &str) {
        assert_eq!(issue_segment(id).unwrap(), id);
    }

    #[rstest]
    #[case("")]
    #[case("../x")]
    #[case("12/comments")]
    #[case("12?state=all")]
    #[case("12#top")]
    #[case("%2e%2e")]
    fn rejected(#[case] id: &str) {
        assert!(matches!(
            issue_segment(id),
            Err(Error::InvalidIssueId(found)) if found == id
        ));
    }
}
