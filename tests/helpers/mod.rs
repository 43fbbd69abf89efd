use std::{path::Path, process::Command};

/// Run a git command in `path`, failing the test if git does.
fn git(path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a Git repo in `path` with some fake config and one commit.
pub fn init(path: &Path) {
    git(path, &["init"]);
    git(path, &["config", "user.email", "fake@example.com"]);
    git(path, &["config", "user.name", "Fake User"]);
    git(path, &["commit", "--allow-empty", "-m", "Initial commit"]);
}

/// Register `url` as the `origin` remote of the repo in `path`.
pub fn add_origin(path: &Path, url: &str) {
    git(path, &["remote", "add", "origin", url]);
}
