use miette::{Diagnostic, Result};

use crate::{
    config::Config,
    integrations::{
        git,
        http::{self, Gateway, ReqwestTransport},
        resolve,
    },
    state::RunType,
    step::Context,
};

mod cli;
mod config;
mod format;
mod integrations;
mod issues;
mod prompt;
mod remote;
mod state;
mod step;

/// The entry point for the `issue2branch` binary.
///
/// ## Errors
/// Anything that stops the chosen step from completing, already formatted for the user.
pub fn run() -> Result<()> {
    let matches = cli::build().get_matches();
    let args = cli::Args::from_matches(&matches).unwrap_or_else(|err| err.exit());
    run_with(args)?;
    Ok(())
}

fn run_with(args: cli::Args) -> Result<(), Error> {
    let config = Config::load()?;
    let remotes = git::get_remotes()?;
    let tracker = resolve::resolve(&config, &args.options, &remotes, prompt::get_password)?;
    let mut gateway = Gateway::new(Box::new(ReqwestTransport::new()?));
    let mut context = Context {
        tracker: tracker.as_ref(),
        gateway: &mut gateway,
        config: &config,
        options: &args.options,
        run_type: RunType::new(args.noop),
    };
    step::run_step(args.step, &mut context, git::checkout_or_create_branch)?;
    Ok(())
}

#[derive(Debug, Diagnostic, thiserror::Error)]
enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Git(#[from] git::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] resolve::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] http::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Step(#[from] step::Error),
}
