use log::debug;
use miette::Diagnostic;

use crate::{
    config::Config,
    integrations::{self, git, http::Gateway, Options, Tracker},
    issues::{Issue, IssueForest},
    state::RunType,
};

/// The one thing a run does, chosen from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Print the open issues as a tree.
    ListIssues,
    /// Print one issue and its description.
    ShowIssue(String),
    /// Switch to the branch named after an issue, optionally assigning it to yourself.
    SwitchToIssue { issue: String, take: bool },
}

/// Everything a [`Step`] needs, resolved once per run.
pub(crate) struct Context<'a> {
    pub(crate) tracker: &'a dyn Tracker,
    pub(crate) gateway: &'a mut Gateway,
    pub(crate) config: &'a Config,
    pub(crate) options: &'a Options,
    pub(crate) run_type: RunType,
}

pub(crate) fn run_step(
    step: Step,
    context: &mut Context,
    switch_branch: impl FnOnce(&str) -> Result<(), git::Error>,
) -> Result<(), Error> {
    match step {
        Step::ListIssues => list_issues(context),
        Step::ShowIssue(issue) => show_issue(context, &issue),
        Step::SwitchToIssue { issue, take } => {
            switch_to_issue(context, &issue, switch_branch)?;
            if take {
                take_issue(context, &issue)?;
            }
            Ok(())
        }
    }
}

fn list_issues(context: &mut Context) -> Result<(), Error> {
    let issues = match context
        .tracker
        .list_issues(context.gateway, context.config, context.options)
    {
        Err(err @ integrations::Error::NotSupported { .. }) => {
            println!("[ERROR] {err}");
            return Ok(());
        }
        other => other?,
    };
    println!("Got {} issues", issues.len());
    let forest = IssueForest::build(issues);
    debug!("{} distinct issues from {}", forest.len(), context.tracker.kind());
    for line in list_lines(&forest) {
        println!("{line}");
    }
    Ok(())
}

/// One line per issue, children indented under their parents.
fn list_lines(forest: &IssueForest) -> Vec<String> {
    forest
        .walk()
        .into_iter()
        .map(|(depth, issue)| format!("{} * {}", "  ".repeat(depth), issue.text()))
        .collect()
}

fn show_issue(context: &mut Context, id: &str) -> Result<(), Error> {
    let issue = context.tracker.get_issue(context.gateway, id)?;
    for line in show_lines(&issue) {
        println!("{line}");
    }
    Ok(())
}

fn show_lines(issue: &Issue) -> Vec<String> {
    let mut lines = vec![issue.text()];
    if let Some(description) = issue.description.as_deref().filter(|text| !text.is_empty()) {
        lines.push(description.to_string());
    }
    lines
}

fn switch_to_issue(
    context: &mut Context,
    id: &str,
    switch_branch: impl FnOnce(&str) -> Result<(), git::Error>,
) -> Result<(), Error> {
    println!("Getting issue title for issue: '{id}'");
    let issue = context.tracker.get_issue(context.gateway, id)?;
    debug!("Fetched {issue}");
    let raw = issue.branch();
    println!("Got branch: '{raw}'");
    let name = git::branch_name(&raw);
    context
        .run_type
        .perform(&format!("Branching '{name}'"), || switch_branch(&name))?;
    Ok(())
}

fn take_issue(context: &mut Context, id: &str) -> Result<(), Error> {
    let run_type = context.run_type;
    let result = run_type.perform(&format!("Taking issue: {id}"), || {
        context
            .tracker
            .take_issue(context.gateway, context.config, id)
    });
    match result {
        Err(err @ integrations::Error::NotSupported { .. }) => {
            println!("[ERROR] {err}");
            Ok(())
        }
        other => Ok(other?),
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Integration(#[from] integrations::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Git(#[from] git::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_steps {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;
    use crate::integrations::{
        github::GitHub,
        http::{testing::ScriptedTransport, Credentials, Method},
        RepoData, TrackerKind,
    };

    fn github(user: Option<&str>) -> GitHub {
        GitHub::new(
            RepoData {
                owner: Some(String::from("o")),
                repository: Some(String::from("r")),
            },
            Credentials {
                user: user.map(String::from),
                password: user.map(|_| String::from("secret")),
            },
        )
    }

    const ISSUE: &str = r#"{"number": 3, "title": "test get branch name", "body": "", "labels": []}"#;

    fn run(
        tracker: &dyn Tracker,
        transport: &ScriptedTransport,
        step: Step,
        run_type: RunType,
    ) -> (Result<(), Error>, Vec<String>) {
        let mut gateway = Gateway::new(Box::new(transport.clone()));
        let config = Config::default();
        let options = Options::default();
        let mut context = Context {
            tracker,
            gateway: &mut gateway,
            config: &config,
            options: &options,
            run_type,
        };
        let switched = RefCell::new(Vec::new());
        let result = run_step(step, &mut context, |name| {
            switched.borrow_mut().push(name.to_string());
            Ok(())
        });
        (result, switched.into_inner())
    }

    #[test]
    fn switches_to_normalized_branch() {
        let transport = ScriptedTransport::default();
        transport.respond_json(ISSUE);
        let (result, switched) = run(
            &github(None),
            &transport,
            Step::SwitchToIssue {
                issue: String::from("3"),
                take: false,
            },
            RunType::Real,
        );
        result.unwrap();
        assert_eq!(switched, vec![String::from("issue-3-test-get-branch-name")]);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn noop_does_not_switch_or_take() {
        let transport = ScriptedTransport::default();
        transport.respond_json(ISSUE);
        let (result, switched) = run(
            &github(Some("me")),
            &transport,
            Step::SwitchToIssue {
                issue: String::from("3"),
                take: true,
            },
            RunType::DryRun,
        );
        result.unwrap();
        assert!(switched.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn take_patches_issue() {
        let transport = ScriptedTransport::default();
        transport.respond_json(ISSUE);
        transport.respond_json("{}");
        let (result, _) = run(
            &github(Some("me")),
            &transport,
            Step::SwitchToIssue {
                issue: String::from("3"),
                take: true,
            },
            RunType::Real,
        );
        result.unwrap();
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(
            serde_json::from_str::<Value>(requests[1].body.as_deref().unwrap()).unwrap(),
            serde_json::json!({"assignee": "me"})
        );
    }

    /// A tracker that can only fetch single issues.
    struct FetchOnly(Credentials);

    impl Tracker for FetchOnly {
        fn kind(&self) -> TrackerKind {
            TrackerKind::Bitbucket
        }

        fn credentials(&self) -> &Credentials {
            &self.0
        }

        fn parse_list(&self, _payload: Value) -> Result<Vec<Issue>, integrations::Error> {
            Ok(Vec::new())
        }

        fn issue_url(&self, id: &str) -> Result<String, integrations::Error> {
            Ok(format!("https://example.com/{id}"))
        }

        fn parse_issue(&self, _payload: Value) -> Result<Issue, integrations::Error> {
            Ok(Issue::new(1_u64, "fetched"))
        }
    }

    #[test]
    fn unsupported_take_is_not_fatal() {
        let transport = ScriptedTransport::default();
        let (result, switched) = run(
            &FetchOnly(Credentials::default()),
            &transport,
            Step::SwitchToIssue {
                issue: String::from("1"),
                take: true,
            },
            RunType::Real,
        );
        result.unwrap();
        assert_eq!(switched, vec![String::from("issue-1-fetched")]);
    }

    #[test]
    fn unsupported_list_is_not_fatal() {
        let transport = ScriptedTransport::default();
        let (result, _) = run(
            &FetchOnly(Credentials::default()),
            &transport,
            Step::ListIssues,
            RunType::Real,
        );
        result.unwrap();
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn failed_fetch_is_fatal() {
        let transport = ScriptedTransport::default();
        transport.respond(404, Some("application/json"), "{}");
        let (result, switched) = run(
            &github(None),
            &transport,
            Step::ShowIssue(String::from("3")),
            RunType::Real,
        );
        assert!(matches!(
            result.unwrap_err(),
            Error::Integration(integrations::Error::Http(_))
        ));
        assert!(switched.is_empty());
    }

    #[test]
    fn lists_through_tracker() {
        let transport = ScriptedTransport::default();
        transport.respond_json(&format!("[{ISSUE}]"));
        let (result, _) = run(&github(None), &transport, Step::ListIssues, RunType::Real);
        result.unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "https://api.github.com/repos/o/r/issues?per_page=40"
        );
    }

    fn issue(id: u64, parent: Option<u64>) -> Issue {
        let mut issue = Issue::new(id, format!("title {id}"));
        issue.parent = parent.map(Into::into);
        issue
    }

    #[test]
    fn list_lines_indent_children() {
        let issues = vec![issue(2, Some(1)), issue(1, None), issue(3, None)];
        let expected: Vec<String> = vec![
            format!(" * {}", issues[1].text()),
            format!("   * {}", issues[0].text()),
            format!(" * {}", issues[2].text()),
        ];
        assert_eq!(list_lines(&IssueForest::build(issues)), expected);
    }

    #[test]
    fn show_lines_include_description() {
        let mut issue = issue(1, None);
        assert_eq!(show_lines(&issue), vec![issue.text()]);
        issue.description = Some(String::from("the description"));
        assert_eq!(
            show_lines(&issue),
            vec![issue.text(), String::from("the description")]
        );
    }
}
