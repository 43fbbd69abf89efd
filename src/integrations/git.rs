use std::{path::PathBuf, sync::OnceLock};

use git2::{build::CheckoutBuilder, Branch, BranchType, Repository};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use miette::Diagnostic;
use regex::Regex;

#[derive(Debug, Diagnostic, thiserror::Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub(crate) struct Error(Box<ErrorKind>);

impl<T: Into<ErrorKind>> From<T> for Error {
    fn from(kind: T) -> Self {
        Self(Box::new(kind.into()))
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
enum ErrorKind {
    #[error("Current directory does not belong to a Git repository: {0}")]
    #[diagnostic(
        code(git::open_repo),
        help("Make sure you are in a Git repository and that you have permission to access it.")
    )]
    OpenRepo(#[source] git2::Error),
    #[error("The Git repository has no working directory")]
    #[diagnostic(
        code(git::bare_repo),
        help("issue2branch needs a checked out work tree to switch branches in.")
    )]
    BareRepo,
    #[error("Unknown Git error: {0}")]
    #[diagnostic(
        code(git::libgit2),
        help(
            "Something went wrong when interacting with Git that we don't have an explanation for. \
                    Maybe try performing the operation manually?"
        )
    )]
    Git(#[from] git2::Error),
    #[error("Bad branch name: {0}")]
    #[diagnostic(
        code(git::bad_branch_name),
        help("The issue title did not produce a usable branch name.")
    )]
    BadBranchName(String),
    #[error("Could not complete checkout")]
    #[diagnostic(
        code(git::incomplete_checkout),
        help("Your uncommitted changes conflict with the branch being checked out. \
                Commit or stash them and try again.")
    )]
    IncompleteCheckout(#[source] git2::Error),
}

fn open_repo() -> Result<Repository, Error> {
    Repository::discover(".")
        .map_err(ErrorKind::OpenRepo)
        .map_err(Error::from)
}

/// The root of the work tree containing the current directory.
pub(crate) fn work_tree_root() -> Result<PathBuf, Error> {
    let repo = open_repo()?;
    repo.workdir()
        .map(PathBuf::from)
        .ok_or_else(|| ErrorKind::BareRepo.into())
}

/// Every remote of the current repo, by name. Remotes without a URL are skipped.
pub(crate) fn get_remotes() -> Result<IndexMap<String, String>, Error> {
    let repo = open_repo()?;
    let names = repo.remotes()?;
    let remotes = names
        .iter()
        .flatten()
        .filter_map(|name| {
            let remote = repo.find_remote(name).ok()?;
            let url = remote.url()?.to_string();
            Some((name.to_string(), url))
        })
        .collect::<IndexMap<_, _>>();
    debug!("Found remotes: {remotes:?}");
    Ok(remotes)
}

/// Switch to the local branch called `name`, creating it at `HEAD` first if it doesn't exist.
pub(crate) fn checkout_or_create_branch(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(ErrorKind::BadBranchName(name.to_string()).into());
    }
    let repo = open_repo()?;
    checkout_or_create_branch_in(&repo, name)
}

fn checkout_or_create_branch_in(repo: &Repository, name: &str) -> Result<(), Error> {
    let existing = repo.find_branch(name, BranchType::Local).ok();
    if let Some(existing) = existing {
        info!("Found existing branch named {name}, switching to it.");
        return switch_to_branch(repo, &existing);
    }
    info!("Creating a new branch called {name}");
    let head = repo.head()?.peel_to_commit()?;
    let branch = repo.branch(name, &head, false)?;
    let ref_name = branch
        .get()
        .name()
        .ok_or_else(|| ErrorKind::BadBranchName(name.to_string()))?;
    // The new branch points at HEAD, so the work tree is already correct.
    repo.set_head(ref_name)?;
    Ok(())
}

fn switch_to_branch(repo: &Repository, branch: &Branch) -> Result<(), Error> {
    let reference = branch.get();
    let ref_name = reference.name().ok_or_else(|| {
        ErrorKind::BadBranchName(String::from_utf8_lossy(reference.name_bytes()).into_owned())
    })?;
    let target = reference.peel_to_commit()?;
    repo.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))
        .map_err(ErrorKind::IncompleteCheckout)?;
    repo.set_head(ref_name)?;
    Ok(())
}

#[allow(clippy::unwrap_used)] // A literal pattern, covered by tests
fn branch_word() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[a-zA-Z0-9#]+").unwrap())
}

/// Turn free text into a branch name: every run of letters, digits and `#`, lowercased and
/// joined with `-`.
pub(crate) fn branch_name(label: &str) -> String {
    branch_word()
        .find_iter(label)
        .map(|word| word.as_str())
        .join("-")
        .to_lowercase()
}

#[cfg(test)]
mod test_branch_name {
    use pretty_assertions::assert_eq;

    use super::branch_name;

    #[test]
    fn basic_branch() {
        assert_eq!(
            branch_name("Issue 3: test get branch name"),
            "issue-3-test-get-branch-name"
        );
    }

    #[test]
    fn symbols_are_deleted() {
        assert_eq!(branch_name("a:.,:;'\"?!\\/()[]{}b"), "a-b");
    }

    #[test]
    fn hashes_are_kept() {
        assert_eq!(branch_name("Bug-#12-Crash on start"), "bug-#12-crash-on-start");
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(branch_name("?!"), "");
    }
}
