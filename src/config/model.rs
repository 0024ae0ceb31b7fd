//! Resolved configuration model.
//!
//! Everything in this module is produced once by the loader (or by hand in
//! tests) and is read-only for the rest of the run. Defaults, group-set
//! settings and path resolution have already been applied; the supervisor
//! never looks at the raw file again.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::time::Duration;

/// Identity of one supervised process: `(group, process)`.
///
/// Used for correlation of output records and for colorization; group-level
/// events use the synthetic process name `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey {
    group: String,
    process: String,
}

impl ProcessKey {
    pub fn new(group: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            process: process.into(),
        }
    }

    /// Synthetic key used for events concerning the group as a whole.
    pub fn for_group(group: impl Into<String>) -> Self {
        Self::new(group, "group")
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn process(&self) -> &str {
        &self.process
    }
}

impl Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.process)
    }
}

/// What a group does when one of its processes exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Restart only the process that exited.
    Process,
    /// Tear the whole group down and start it again.
    Group,
}

/// Restart budget and pacing shared by every process of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    /// `None` means unlimited.
    pub max_restarts: Option<u32>,
    pub restart_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: None,
            restart_delay: Duration::from_secs(1),
        }
    }
}

impl RestartPolicy {
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = Some(max_restarts);
        self
    }

    pub fn with_restart_delay(mut self, restart_delay: Duration) -> Self {
        self.restart_delay = restart_delay;
        self
    }
}

/// Where a process's stdout/stderr go.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPolicy {
    /// The child inherits the supervisor's stdout/stderr.
    Inherit,
    /// Both streams are appended to `path`; the file is rotated before each
    /// run and tailed back into the sink while the process lives.
    File {
        path: PathBuf,
        /// Rotation threshold; 0 disables rotation.
        max_bytes: u64,
        /// Total file count including the active one. Only meaningful when
        /// rotation is enabled, and then always >= 1.
        max_files: u32,
    },
}

/// One supervised child process, fully resolved.
#[derive(Debug, Clone)]
pub struct ResolvedProcess {
    pub key: ProcessKey,
    /// What actually gets spawned. For shell-command processes this is the
    /// platform shell and `arguments` carries the `-c`/`/C` invocation.
    pub executable_path: PathBuf,
    pub arguments: Vec<String>,
    /// Human-facing rendition of the command, kept for output records.
    pub display_path: String,
    pub working_directory: PathBuf,
    /// `None` values mean "unset this variable in the child".
    pub environment: BTreeMap<String, Option<String>>,
    /// Present when the process was configured as a shell command line.
    pub shell_command: Option<String>,
    pub output: OutputPolicy,
}

impl ResolvedProcess {
    pub fn new(key: ProcessKey, executable_path: impl Into<PathBuf>) -> Self {
        let executable_path = executable_path.into();
        let display_path = executable_path.display().to_string();
        Self {
            key,
            executable_path,
            arguments: Vec::new(),
            display_path,
            working_directory: PathBuf::from("."),
            environment: BTreeMap::new(),
            shell_command: None,
            output: OutputPolicy::Inherit,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_display_path(mut self, display_path: impl Into<String>) -> Self {
        self.display_path = display_path.into();
        self
    }

    pub fn with_working_directory(mut self, working_directory: impl Into<PathBuf>) -> Self {
        self.working_directory = working_directory.into();
        self
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, Option<String>>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_shell_command(mut self, shell_command: impl Into<String>) -> Self {
        self.shell_command = Some(shell_command.into());
        self
    }

    pub fn with_output(mut self, output: OutputPolicy) -> Self {
        self.output = output;
        self
    }
}

/// A named collection of processes sharing a restart policy and dependency
/// declaration.
#[derive(Debug, Clone)]
pub struct ResolvedProcessGroup {
    pub name: String,
    pub restart_mode: RestartMode,
    pub restart_policy: RestartPolicy,
    /// Group names this group depends on, deduplicated, declaration order.
    pub dependencies: Vec<String>,
    /// Never empty.
    pub processes: Vec<ResolvedProcess>,
}

impl ResolvedProcessGroup {
    pub fn new(name: impl Into<String>, processes: Vec<ResolvedProcess>) -> Self {
        Self {
            name: name.into(),
            restart_mode: RestartMode::Group,
            restart_policy: RestartPolicy::default(),
            dependencies: Vec::new(),
            processes,
        }
    }

    pub fn with_restart_mode(mut self, restart_mode: RestartMode) -> Self {
        self.restart_mode = restart_mode;
        self
    }

    pub fn with_restart_policy(mut self, restart_policy: RestartPolicy) -> Self {
        self.restart_policy = restart_policy;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// The whole resolved configuration: input to graph building and the
/// top-level supervisor.
#[derive(Debug, Clone)]
pub struct ResolvedProcessConfig {
    pub base_directory: PathBuf,
    pub groups: BTreeMap<String, ResolvedProcessGroup>,
}

impl ResolvedProcessConfig {
    pub fn from_groups(
        base_directory: impl Into<PathBuf>,
        groups: Vec<ResolvedProcessGroup>,
    ) -> Self {
        Self {
            base_directory: base_directory.into(),
            groups: groups
                .into_iter()
                .map(|group| (group.name.clone(), group))
                .collect(),
        }
    }
}
