//! Parsing of Git remote URLs into the pieces needed to talk to a hosted tracker.

use std::sync::OnceLock;

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

/// Where a remote lives: `git@{domain}:{owner}/{repository}` or
/// `https://{domain}/{owner}/{repository}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RemoteDescriptor {
    pub(crate) domain: String,
    pub(crate) owner: String,
    pub(crate) repository: String,
}

#[allow(clippy::unwrap_used)] // A literal pattern, covered by tests
fn ssh_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^@]+@([^:]+):([^/]+)/(.+)").unwrap())
}

#[allow(clippy::unwrap_used)]
fn http_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://([^/]+)/([^/]+)/(.+)").unwrap())
}

impl RemoteDescriptor {
    /// Parse a remote URL, trying the SSH form first and then HTTP(S).
    ///
    /// ## Errors
    /// If there is no URL at all, or it matches neither form.
    pub(crate) fn parse(url: Option<&str>) -> Result<Self, Error> {
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            return Err(Error::InvalidRemote(String::new()));
        };
        [ssh_pattern(), http_pattern()]
            .into_iter()
            .find_map(|pattern| pattern.captures(url))
            .map(|captures| Self {
                domain: captures[1].to_string(),
                owner: captures[2].to_string(),
                repository: captures[3].to_string(),
            })
            .ok_or_else(|| Error::InvalidRemote(url.to_string()))
    }
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum Error {
    #[error("Invalid remote url: '{0}'")]
    #[diagnostic(
        code(remote::invalid),
        help("Remotes must look like `git@domain:owner/repo` or `https://domain/owner/repo`")
    )]
    InvalidRemote(String),
}
