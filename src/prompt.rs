use inquire::{InquireError, Password};
use miette::Diagnostic;

/// Ask for a secret without echoing it.
pub(crate) fn get_password(prompt: &str) -> Result<String, Error> {
    Password::new(prompt)
        .with_display_toggle_enabled()
        .without_confirmation()
        .prompt()
        .map_err(Error)
}

#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("Failed to get user input")]
#[diagnostic(
    code(prompt),
    help("A password is needed for the configured user. Set it under [auth] or pass --password.")
)]
pub(crate) struct Error(#[from] InquireError);
