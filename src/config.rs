use std::{
    any::type_name,
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use indexmap::IndexMap;
use log::{debug, info};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use toml::{Table, Value};

use crate::integrations::git;

/// Read-only view of `.issue2branch.toml`, a set of `[section]` tables holding scalar values.
///
/// Every value is kept as text; callers that need a number coerce it with [`Config::get_as`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Config {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl Config {
    pub(crate) const CONFIG_PATH: &'static str = ".issue2branch.toml";
    pub(crate) const CONFIG_ENV: &'static str = "ISSUE2BRANCH_CONFIG";

    /// Load the config from `$ISSUE2BRANCH_CONFIG`, or from the root of the current Git work tree.
    ///
    /// A missing file is not an error, it just means every lookup falls back to its default.
    ///
    /// ## Errors
    /// 1. There's no config override and the current directory is not in a Git repository
    /// 2. The file exists but can't be read or isn't valid TOML
    pub(crate) fn load() -> Result<Self, Error> {
        let path = Self::locate()?;
        info!("Loading issue2branch config from: '{}'", path.display());
        match std::fs::read_to_string(&path) {
            Ok(source) => Self::from_toml(&path.display().to_string(), source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(Error::Read { path, source }),
        }
    }

    fn locate() -> Result<PathBuf, Error> {
        if let Some(path) = env::var_os(Self::CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let root = git::work_tree_root()?;
        Ok(root.join(Path::new(Self::CONFIG_PATH)))
    }

    /// Parse TOML source text. `name` is only used to point at the file in error messages.
    pub(crate) fn from_toml(name: &str, source: String) -> Result<Self, Error> {
        let table: Table = match toml::from_str(&source) {
            Ok(table) => table,
            Err(err) => {
                return Err(Error::Parse {
                    message: err.message().to_string(),
                    span: err.span().map(SourceSpan::from),
                    source_code: NamedSource::new(name, source),
                })
            }
        };
        let mut sections = IndexMap::new();
        for (section, value) in table {
            let Value::Table(values) = value else {
                debug!("Ignoring top-level key {section}, every key must be inside a section");
                continue;
            };
            let values = values
                .into_iter()
                .map(|(key, value)| (key, scalar_to_string(value)))
                .collect();
            sections.insert(section, values);
        }
        Ok(Self { sections })
    }

    /// Build a config directly from sections of key/value pairs.
    #[cfg(test)]
    pub(crate) fn from_sections<'a, S, K>(sections: S) -> Self
    where
        S: IntoIterator<Item = (&'a str, K)>,
        K: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            sections: sections
                .into_iter()
                .map(|(section, values)| {
                    (
                        section.to_string(),
                        values
                            .into_iter()
                            .map(|(key, value)| (key.to_string(), value.to_string()))
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    pub(crate) fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }

    /// Look up a value and convert it with [`FromStr`].
    ///
    /// ## Errors
    /// If the value is present but can't be converted to `T`.
    pub(crate) fn get_as<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, Error> {
        self.get(section, key)
            .map(|value| {
                value.parse().map_err(|_| Error::Coerce {
                    section: section.to_string(),
                    key: key.to_string(),
                    target: type_name::<T>(),
                })
            })
            .transpose()
    }

    /// ## Errors
    /// [`Error::Missing`] if there is no such value.
    pub(crate) fn require(&self, section: &str, key: &str) -> Result<&str, Error> {
        self.get(section, key).ok_or_else(|| Error::missing(section, key))
    }

    /// ## Errors
    /// If the value is missing or can't be converted to `T`.
    pub(crate) fn require_as<T: FromStr>(&self, section: &str, key: &str) -> Result<T, Error> {
        self.get_as(section, key)?
            .ok_or_else(|| Error::missing(section, key))
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(value) => value,
        other => other.to_string(),
    }
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum Error {
    #[error("Config missing: Section:'{section}', Option:'{key}'")]
    #[diagnostic(
        code(config::missing),
        help("Add `{key} = ...` under a `[{section}]` table in .issue2branch.toml")
    )]
    Missing { section: String, key: String },
    #[error("Config @ {section}:{key} is not a {target}")]
    #[diagnostic(code(config::coerce))]
    Coerce {
        section: String,
        key: String,
        target: &'static str,
    },
    #[error("Could not read config file {path}: {source}")]
    #[diagnostic(
        code(config::read),
        help("Make sure you have permission to read this file.")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {message}")]
    #[diagnostic(code(config::parse))]
    Parse {
        message: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        source_code: NamedSource,
    },
    #[error(transparent)]
    #[diagnostic(
        code(config::locate),
        help("Run from inside a Git repository or point ISSUE2BRANCH_CONFIG at a config file")
    )]
    Locate(#[from] git::Error),
}

impl Error {
    pub(crate) fn missing(section: &str, key: &str) -> Self {
        Self::Missing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}
