use crate::graph::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong before the supervisor starts. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized config format for `{0}` (expected .json, .ini, .conf or .cfg)")]
    UnknownFormat(PathBuf),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid INI config: {0}")]
    Ini(String),

    #[error("unrecognized section `[{0}]`")]
    UnknownSection(String),

    #[error("unrecognized key `{key}` in section `[{section}]`")]
    UnknownKey { section: String, key: String },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("group set `{set}` references unknown group `{group}`")]
    UnknownGroupInSet { set: String, group: String },

    #[error("group `{group}` has no processes")]
    EmptyGroup { group: String },

    #[error("process `{key}` must set either `command` or `path`")]
    MissingCommand { key: String },

    #[error("process `{key}` sets `command` together with `path` or `args`")]
    CommandConflict { key: String },

    #[error("group `{group}` depends on itself")]
    SelfDependency { group: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
