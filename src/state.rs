/// Whether side effects (switching branches, taking issues) should actually happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunType {
    /// `--noop`: describe every side effect instead of performing it. Reads still happen.
    DryRun,
    /// Actually do the thing.
    Real,
}

impl RunType {
    pub(crate) fn new(noop: bool) -> Self {
        if noop {
            Self::DryRun
        } else {
            Self::Real
        }
    }

    /// Print `message`, then run `action` unless this is a dry run.
    pub(crate) fn perform<E>(
        self,
        message: &str,
        action: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Self::DryRun => {
                println!("(noop) {message}");
                Ok(())
            }
            Self::Real => {
                println!("{message}");
                action()
            }
        }
    }
}
