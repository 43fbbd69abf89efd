use clap::{command, error::ErrorKind, value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};

use crate::{integrations::Options, step::Step};

pub(crate) const USER_ENV: &str = "ISSUE2BRANCH_USER";
pub(crate) const PASSWORD_ENV: &str = "ISSUE2BRANCH_PASSWORD";

pub(crate) fn build() -> Command {
    command!()
        .about("Create and switch to a git branch named after an issue in your tracker")
        .arg(Arg::new("issue").help("Issue to start working on"))
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List current issues"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .help("Limit --list size to this value"),
        )
        .arg(
            Arg::new("noop")
                .short('n')
                .long("noop")
                .action(ArgAction::SetTrue)
                .help("Show branch name but don't create it"),
        )
        .arg(
            Arg::new("take")
                .short('t')
                .long("take")
                .action(ArgAction::SetTrue)
                .help("Sets yourself as the assignee, if possible"),
        )
        .arg(
            Arg::new("show")
                .short('s')
                .long("show")
                .value_name("ID")
                .help("Show an issue and its description"),
        )
        .arg(
            Arg::new("mine")
                .short('m')
                .long("mine")
                .action(ArgAction::SetTrue)
                .help("Only show issues assigned to me (Redmine)"),
        )
        .arg(
            Arg::new("fixed-version")
                .short('v')
                .long("fixed-version")
                .value_name("VERSION")
                .help("Filter issue list by version (Redmine)"),
        )
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Show all issues, including closed ones (Redmine)"),
        )
        .arg(
            Arg::new("project")
                .short('p')
                .long("project")
                .help("Only list issues of this project (Redmine)"),
        )
        .arg(
            Arg::new("all-projects")
                .long("all-projects")
                .action(ArgAction::SetTrue)
                .conflicts_with("project")
                .help("List issues of every project, ignoring the configured one (Redmine)"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .env(USER_ENV)
                .help("Log in as this user instead of [auth] user"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .env(PASSWORD_ENV)
                .hide_env_values(true)
                .help("Password for the user, instead of [auth] password"),
        )
        .group(
            ArgGroup::new("action")
                .args(["issue", "list", "show"])
                .multiple(true)
                .required(true),
        )
}

/// Everything the command line decided for this run.
#[derive(Debug)]
pub(crate) struct Args {
    pub(crate) step: Step,
    pub(crate) options: Options,
    pub(crate) noop: bool,
}

impl Args {
    /// `--list` beats `--show`, which beats a positional issue.
    ///
    /// ## Errors
    /// If none of them was given.
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let string = |id: &str| matches.get_one::<String>(id).cloned();
        let flag = |id: &str| matches.get_flag(id);

        let step = if flag("list") {
            Step::ListIssues
        } else if let Some(issue) = string("show") {
            Step::ShowIssue(issue)
        } else if let Some(issue) = string("issue") {
            Step::SwitchToIssue {
                issue,
                take: flag("take"),
            }
        } else {
            return Err(build().error(
                ErrorKind::MissingRequiredArgument,
                "Must supply an issue, -l/--list or -s/--show",
            ));
        };

        let options = Options {
            limit: matches.get_one::<i64>("limit").copied(),
            mine: flag("mine"),
            fixed_version: string("fixed-version"),
            all: flag("all"),
            project: string("project"),
            all_projects: flag("all-projects"),
            user: string("user"),
            password: string("password"),
        };
        Ok(Self {
            step,
            options,
            noop: flag("noop"),
        })
    }
}
