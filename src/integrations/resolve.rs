use indexmap::IndexMap;
use log::debug;
use miette::Diagnostic;

use super::{
    bitbucket::Bitbucket, github::GitHub, http::Credentials, redmine::Redmine, Options, RepoData,
    Tracker, TrackerKind,
};
use crate::{config, config::Config, prompt, remote::RemoteDescriptor};

/// Pick the tracker for this run and bind it to a repository and a login.
///
/// `[main] tracker` wins when set. Otherwise the `origin` remote's domain decides, trying every
/// [`TrackerKind`] in order. `prompt` is only called, once, if a user is known but no password.
///
/// ## Errors
/// 1. [`Error::UnknownTracker`] for a configured name that isn't a tracker
/// 2. [`Error::TrackerNotFound`] when nothing is configured and no remote matches
/// 3. The chosen tracker is missing required config
/// 4. Asking for the password failed
pub(crate) fn resolve(
    config: &Config,
    options: &Options,
    remotes: &IndexMap<String, String>,
    prompt: impl FnOnce(&str) -> Result<String, prompt::Error>,
) -> Result<Box<dyn Tracker>, Error> {
    let origin = remotes.get("origin").map(String::as_str);
    let (kind, remote) = if let Some(name) = config.get("main", "tracker") {
        let kind = TrackerKind::from_name(name).ok_or_else(|| Error::UnknownTracker {
            name: name.to_string(),
        })?;
        let remote = match RemoteDescriptor::parse(origin) {
            Ok(remote) if kind.matches_domain(&remote.domain) => Some(remote),
            Ok(remote) => {
                debug!("Remote {} does not belong to {kind}, ignoring it", remote.domain);
                None
            }
            Err(err) => {
                debug!("Ignoring origin remote: {err}");
                None
            }
        };
        (kind, remote)
    } else {
        let remote = RemoteDescriptor::parse(origin).map_err(|err| {
            debug!("Could not use origin remote to find a tracker: {err}");
            Error::TrackerNotFound
        })?;
        let kind = TrackerKind::ALL
            .into_iter()
            .find(|kind| kind.matches_domain(&remote.domain))
            .ok_or(Error::TrackerNotFound)?;
        debug!("{kind} matched remote domain {}", remote.domain);
        (kind, Some(remote))
    };

    let credentials = Credentials::resolve(
        non_empty(options.user.as_deref()).or_else(|| non_empty(config.get("auth", "user"))),
        non_empty(options.password.as_deref())
            .or_else(|| non_empty(config.get("auth", "password"))),
        prompt,
    )?;
    build(kind, config, remote.as_ref(), credentials)
}

/// An empty user or password counts as not given.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(String::from)
}

fn build(
    kind: TrackerKind,
    config: &Config,
    remote: Option<&RemoteDescriptor>,
    credentials: Credentials,
) -> Result<Box<dyn Tracker>, Error> {
    let repo = || RepoData::from_config(config, kind).or_remote(remote);
    let tracker: Box<dyn Tracker> = match kind {
        TrackerKind::GitHub => Box::new(GitHub::new(repo(), credentials)),
        TrackerKind::Bitbucket => Box::new(Bitbucket::new(repo(), credentials)),
        TrackerKind::Redmine => Box::new(Redmine::new(config, credentials)?),
    };
    Ok(tracker)
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("'{name}' is not a valid issue tracker")]
    #[diagnostic(
        code(resolve::unknown_tracker),
        help("Set `tracker` under [main] to one of: github, bitbucket, redmine")
    )]
    UnknownTracker { name: String },
    #[error("Could not deduce issue tracker from git remotes, nor it was specified in the config")]
    #[diagnostic(
        code(resolve::tracker_not_found),
        help("Point the origin remote at GitHub or Bitbucket, or set `tracker` under [main] in .issue2branch.toml")
    )]
    TrackerNotFound,
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] prompt::Error),
}
