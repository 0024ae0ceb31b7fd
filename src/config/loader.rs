//! Configuration loading: INI/JSON parsing, layered merging and resolution
//! into the read-only model the runtime consumes.
//!
//! Settings merge defaults -> group-sets containing the group (alphabetical
//! by set name) -> group -> process, later layers winning field-wise and
//! environments merging by key. Group-set names appearing in `dependencies`
//! expand to the set's member groups.

use super::error::ConfigError;
use super::model::{
    OutputPolicy, ProcessKey, ResolvedProcess, ResolvedProcessConfig, ResolvedProcessGroup,
    RestartMode, RestartPolicy,
};
use crate::executor::script::sanitize_file_name;
use crate::graph::DependencyGraph;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_OUTPUT_DIR: &str = "logs";
const DEFAULT_OUTPUT_MAX_FILES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Ini,
    Json,
}

/// Loads and resolves a configuration file, picking the format from the
/// extension. Paths resolve against `base_dir`, defaulting to the config
/// file's own directory.
pub fn load_file(
    path: &Path,
    base_dir: Option<&Path>,
) -> Result<ResolvedProcessConfig, ConfigError> {
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ConfigFormat::Json,
        Some("ini" | "conf" | "cfg") => ConfigFormat::Ini,
        _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_directory = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let base_directory = base_directory.canonicalize().unwrap_or(base_directory);
    load_str(&content, format, &base_directory)
}

pub fn load_str(
    content: &str,
    format: ConfigFormat,
    base_directory: &Path,
) -> Result<ResolvedProcessConfig, ConfigError> {
    let raw = match format {
        ConfigFormat::Json => serde_json::from_str::<RawConfig>(content)?,
        ConfigFormat::Ini => parse_ini(content)?,
    };
    resolve(raw, base_directory)
}

////////////////////////////////////////////////////////////////////////////////////
// Raw file model
////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    defaults: RawSettings,
    #[serde(default)]
    sets: BTreeMap<String, RawSet>,
    #[serde(default)]
    groups: BTreeMap<String, RawGroup>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct RawSettings {
    restart_mode: Option<RestartMode>,
    max_restarts: Option<RestartLimit>,
    restart_delay: Option<String>,
    output: Option<RawOutputMode>,
    output_dir: Option<PathBuf>,
    output_max_bytes: Option<u64>,
    output_max_files: Option<u32>,
    cwd: Option<PathBuf>,
    #[serde(default)]
    environment: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSet {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawGroup {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    processes: BTreeMap<String, RawProcess>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawProcess {
    command: Option<String>,
    path: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawOutputMode {
    Inherit,
    File,
}

/// Restart budget as written in the file: a count or the word `unlimited`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RestartLimitRepr")]
struct RestartLimit(Option<u32>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RestartLimitRepr {
    Count(u32),
    Word(String),
}

impl TryFrom<RestartLimitRepr> for RestartLimit {
    type Error = String;

    fn try_from(value: RestartLimitRepr) -> Result<Self, Self::Error> {
        match value {
            RestartLimitRepr::Count(count) => Ok(RestartLimit(Some(count))),
            RestartLimitRepr::Word(word) => word.parse(),
        }
    }
}

impl FromStr for RestartLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unlimited" {
            return Ok(RestartLimit(None));
        }
        s.parse::<u32>()
            .map(|count| RestartLimit(Some(count)))
            .map_err(|_| format!("expected a non-negative integer or `unlimited`, got `{s}`"))
    }
}

impl RawSettings {
    /// Field-wise layering with `over` winning; environments merge by key.
    fn merged_with(&self, over: &RawSettings) -> RawSettings {
        let mut environment = self.environment.clone();
        environment.extend(over.environment.clone());
        RawSettings {
            restart_mode: over.restart_mode.or(self.restart_mode),
            max_restarts: over.max_restarts.or(self.max_restarts),
            restart_delay: over
                .restart_delay
                .clone()
                .or_else(|| self.restart_delay.clone()),
            output: over.output.or(self.output),
            output_dir: over.output_dir.clone().or_else(|| self.output_dir.clone()),
            output_max_bytes: over.output_max_bytes.or(self.output_max_bytes),
            output_max_files: over.output_max_files.or(self.output_max_files),
            cwd: over.cwd.clone().or_else(|| self.cwd.clone()),
            environment,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////
// INI front end
////////////////////////////////////////////////////////////////////////////////////

/// INI files carry the same model with sections `[defaults]`, `[set <name>]`,
/// `[group <name>]` and `[process <group> <process>]`; list-valued keys are
/// split shell-style. A process section implicitly creates its group.
fn parse_ini(content: &str) -> Result<RawConfig, ConfigError> {
    let sections: HashMap<String, HashMap<String, String>> = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Ini))
        .build()
        .and_then(|parsed| parsed.try_deserialize())
        .map_err(|err| ConfigError::Ini(err.to_string()))?;

    let mut raw = RawConfig::default();
    let mut sections: Vec<_> = sections.into_iter().collect();
    // Sorted so group sections land before their process sections and the
    // result is independent of hash order.
    sections.sort_by(|a, b| a.0.cmp(&b.0));

    for (section, mut values) in sections {
        let words: Vec<&str> = section.split_whitespace().collect();
        match words.as_slice() {
            ["defaults"] => raw.defaults = settings_from_ini(&section, values)?,
            ["set", name] => {
                let groups = take_word_list(&mut values, "groups")?;
                raw.sets.insert(
                    name.to_string(),
                    RawSet {
                        groups,
                        settings: settings_from_ini(&section, values)?,
                    },
                );
            }
            ["group", name] => {
                let dependencies = take_word_list(&mut values, "dependencies")?;
                let group = raw.groups.entry(name.to_string()).or_default();
                group.dependencies = dependencies;
                group.settings = settings_from_ini(&section, values)?;
            }
            ["process", group, name] => {
                let process = RawProcess {
                    command: values.remove("command"),
                    path: values.remove("path"),
                    args: take_word_list(&mut values, "args")?,
                    settings: settings_from_ini(&section, values)?,
                };
                raw.groups
                    .entry(group.to_string())
                    .or_default()
                    .processes
                    .insert(name.to_string(), process);
            }
            _ => return Err(ConfigError::UnknownSection(section)),
        }
    }
    Ok(raw)
}

fn settings_from_ini(
    section: &str,
    values: HashMap<String, String>,
) -> Result<RawSettings, ConfigError> {
    let mut settings = RawSettings::default();
    let mut values: Vec<_> = values.into_iter().collect();
    values.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in values {
        match key.as_str() {
            "restart_mode" => {
                settings.restart_mode = Some(match value.as_str() {
                    "process" => RestartMode::Process,
                    "group" => RestartMode::Group,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            key: key.clone(),
                            reason: format!("expected `process` or `group`, got `{other}`"),
                        })
                    }
                })
            }
            "max_restarts" => {
                settings.max_restarts =
                    Some(value.parse().map_err(|reason| ConfigError::InvalidValue {
                        key: key.clone(),
                        reason,
                    })?)
            }
            "restart_delay" => settings.restart_delay = Some(value),
            "output" => {
                settings.output = Some(match value.as_str() {
                    "inherit" => RawOutputMode::Inherit,
                    "file" => RawOutputMode::File,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            key: key.clone(),
                            reason: format!("expected `inherit` or `file`, got `{other}`"),
                        })
                    }
                })
            }
            "output_dir" => settings.output_dir = Some(PathBuf::from(value)),
            "output_max_bytes" => {
                settings.output_max_bytes =
                    Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.clone(),
                        reason: format!("expected a byte count, got `{value}`"),
                    })?)
            }
            "output_max_files" => {
                settings.output_max_files =
                    Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.clone(),
                        reason: format!("expected a file count, got `{value}`"),
                    })?)
            }
            "cwd" => settings.cwd = Some(PathBuf::from(value)),
            "environment" => settings.environment = environment_from_ini(&value)?,
            _ => {
                return Err(ConfigError::UnknownKey {
                    section: section.to_string(),
                    key: key.clone(),
                })
            }
        }
    }
    Ok(settings)
}

/// `NAME=VALUE` tokens set a variable; a bare `NAME` unsets it in the child.
fn environment_from_ini(value: &str) -> Result<BTreeMap<String, Option<String>>, ConfigError> {
    let mut environment = BTreeMap::new();
    for token in split_words("environment", value)? {
        match token.split_once('=') {
            Some((name, value)) => environment.insert(name.to_string(), Some(value.to_string())),
            None => environment.insert(token, None),
        };
    }
    Ok(environment)
}

fn take_word_list(
    values: &mut HashMap<String, String>,
    key: &str,
) -> Result<Vec<String>, ConfigError> {
    match values.remove(key) {
        Some(value) => split_words(key, &value),
        None => Ok(Vec::new()),
    }
}

fn split_words(key: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    shell_words::split(value).map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

////////////////////////////////////////////////////////////////////////////////////
// Resolution
////////////////////////////////////////////////////////////////////////////////////

fn resolve(raw: RawConfig, base_directory: &Path) -> Result<ResolvedProcessConfig, ConfigError> {
    for (set_name, set) in &raw.sets {
        for member in &set.groups {
            if !raw.groups.contains_key(member) {
                return Err(ConfigError::UnknownGroupInSet {
                    set: set_name.clone(),
                    group: member.clone(),
                });
            }
        }
    }

    let mut groups = BTreeMap::new();
    for (group_name, group) in &raw.groups {
        if group.processes.is_empty() {
            return Err(ConfigError::EmptyGroup {
                group: group_name.clone(),
            });
        }

        let mut settings = raw.defaults.clone();
        for set in raw
            .sets
            .values()
            .filter(|set| set.groups.contains(group_name))
        {
            settings = settings.merged_with(&set.settings);
        }
        let group_settings = settings.merged_with(&group.settings);

        let dependencies = expand_dependencies(group_name, &group.dependencies, &raw)?;
        let restart_mode = group_settings.restart_mode.unwrap_or(RestartMode::Group);
        let restart_policy = restart_policy(&group_settings)?;

        let processes = group
            .processes
            .iter()
            .map(|(process_name, process)| {
                resolve_process(group_name, process_name, process, &group_settings, base_directory)
            })
            .collect::<Result<Vec<_>, _>>()?;

        groups.insert(
            group_name.clone(),
            ResolvedProcessGroup {
                name: group_name.clone(),
                restart_mode,
                restart_policy,
                dependencies,
                processes,
            },
        );
    }

    let resolved = ResolvedProcessConfig {
        base_directory: base_directory.to_path_buf(),
        groups,
    };
    // Rejects cycles and any dependency name the expansion let through.
    DependencyGraph::build(&resolved)?;
    Ok(resolved)
}

/// Set names expand to their members; duplicates collapse keeping the first
/// occurrence's position.
fn expand_dependencies(
    group_name: &str,
    declared: &[String],
    raw: &RawConfig,
) -> Result<Vec<String>, ConfigError> {
    let mut dependencies: Vec<String> = Vec::new();
    let mut add = |name: &String, dependencies: &mut Vec<String>| {
        if name == group_name {
            return Err(ConfigError::SelfDependency {
                group: group_name.to_string(),
            });
        }
        if !dependencies.contains(name) {
            dependencies.push(name.clone());
        }
        Ok(())
    };

    for dependency in declared {
        match raw.sets.get(dependency) {
            Some(set) => {
                for member in &set.groups {
                    add(member, &mut dependencies)?;
                }
            }
            None => add(dependency, &mut dependencies)?,
        }
    }
    Ok(dependencies)
}

fn restart_policy(settings: &RawSettings) -> Result<RestartPolicy, ConfigError> {
    let mut policy = RestartPolicy::default();
    if let Some(RestartLimit(limit)) = settings.max_restarts {
        policy.max_restarts = limit;
    }
    if let Some(delay) = &settings.restart_delay {
        policy.restart_delay = parse_duration("restart_delay", delay)?;
    }
    Ok(policy)
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    duration_str::parse(value).map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn resolve_process(
    group_name: &str,
    process_name: &str,
    process: &RawProcess,
    group_settings: &RawSettings,
    base_directory: &Path,
) -> Result<ResolvedProcess, ConfigError> {
    let key = ProcessKey::new(group_name, process_name);
    let settings = group_settings.merged_with(&process.settings);

    let (executable_path, arguments, display_path, shell_command) =
        match (&process.command, &process.path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::CommandConflict {
                    key: key.to_string(),
                })
            }
            (Some(command), None) => {
                if !process.args.is_empty() {
                    return Err(ConfigError::CommandConflict {
                        key: key.to_string(),
                    });
                }
                let (shell, shell_args) = shell_invocation(command);
                (shell, shell_args, command.clone(), Some(command.clone()))
            }
            (None, Some(path)) => (
                resolve_path(base_directory, Path::new(path)),
                process.args.clone(),
                path.clone(),
                None,
            ),
            (None, None) => {
                return Err(ConfigError::MissingCommand {
                    key: key.to_string(),
                })
            }
        };

    let working_directory = settings
        .cwd
        .as_ref()
        .map(|cwd| resolve_path(base_directory, cwd))
        .unwrap_or_else(|| base_directory.to_path_buf());

    let output = match settings.output.unwrap_or(RawOutputMode::Inherit) {
        RawOutputMode::Inherit => OutputPolicy::Inherit,
        RawOutputMode::File => {
            let dir = settings
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
            let path = resolve_path(base_directory, &dir)
                .join(sanitize_file_name(group_name))
                .join(format!("{}.log", sanitize_file_name(process_name)));
            let max_bytes = settings.output_max_bytes.unwrap_or(0);
            let max_files = settings.output_max_files.unwrap_or(DEFAULT_OUTPUT_MAX_FILES);
            if max_bytes > 0 && max_files < 1 {
                return Err(ConfigError::InvalidValue {
                    key: "output_max_files".to_string(),
                    reason: "must be at least 1 when rotation is enabled".to_string(),
                });
            }
            OutputPolicy::File {
                path,
                max_bytes,
                max_files,
            }
        }
    };

    Ok(ResolvedProcess {
        key,
        executable_path,
        arguments,
        display_path,
        working_directory,
        environment: settings.environment,
        shell_command,
        output,
    })
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn shell_invocation(command: &str) -> (PathBuf, Vec<String>) {
            (
                PathBuf::from("cmd.exe"),
                vec!["/C".to_string(), command.to_string()],
            )
        }
    } else {
        fn shell_invocation(command: &str) -> (PathBuf, Vec<String>) {
            (
                PathBuf::from("/bin/sh"),
                vec!["-c".to_string(), command.to_string()],
            )
        }
    }
}

fn resolve_path(base_directory: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_directory.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    const BASE: &str = "/srv/app";

    fn load_json(content: &str) -> Result<ResolvedProcessConfig, ConfigError> {
        load_str(content, ConfigFormat::Json, Path::new(BASE))
    }

    fn load_ini(content: &str) -> Result<ResolvedProcessConfig, ConfigError> {
        load_str(content, ConfigFormat::Ini, Path::new(BASE))
    }

    #[test]
    fn json_full_example_resolves() {
        let config = load_json(
            r#"{
                "defaults": {
                    "restart_delay": "250ms",
                    "environment": {"APP_ENV": "dev"}
                },
                "sets": {
                    "backend": {"groups": ["db", "api"], "max_restarts": 4}
                },
                "groups": {
                    "db": {
                        "processes": {
                            "postgres": {"path": "bin/postgres", "args": ["-D", "data"]}
                        }
                    },
                    "api": {
                        "dependencies": ["db"],
                        "restart_mode": "process",
                        "processes": {
                            "web": {
                                "command": "python -m http.server",
                                "output": "file",
                                "output_max_bytes": 1024,
                                "output_max_files": 3,
                                "environment": {"APP_ENV": "prod", "LC_ALL": null}
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.groups.len(), 2);

        let db = &config.groups["db"];
        assert_eq!(db.restart_mode, RestartMode::Group);
        assert_eq!(db.restart_policy.max_restarts, Some(4));
        assert_eq!(db.restart_policy.restart_delay, Duration::from_millis(250));
        let postgres = &db.processes[0];
        assert_eq!(postgres.executable_path, Path::new("/srv/app/bin/postgres"));
        assert_eq!(postgres.display_path, "bin/postgres");
        assert_eq!(postgres.arguments, ["-D", "data"]);
        assert_eq!(postgres.shell_command, None);
        assert_eq!(postgres.output, OutputPolicy::Inherit);

        let api = &config.groups["api"];
        assert_eq!(api.restart_mode, RestartMode::Process);
        assert_eq!(api.dependencies, ["db"]);
        let web = &api.processes[0];
        assert_eq!(web.shell_command.as_deref(), Some("python -m http.server"));
        assert_eq!(web.display_path, "python -m http.server");
        assert_eq!(
            web.environment.get("APP_ENV"),
            Some(&Some("prod".to_string()))
        );
        assert_eq!(web.environment.get("LC_ALL"), Some(&None));
        assert_eq!(
            web.output,
            OutputPolicy::File {
                path: PathBuf::from("/srv/app/logs/api/web.log"),
                max_bytes: 1024,
                max_files: 3,
            }
        );
    }

    #[test]
    fn ini_full_example_resolves() {
        let config = load_ini(
            r#"
[defaults]
restart_delay = 250ms
environment = APP_ENV=dev

[set backend]
groups = db api
max_restarts = 4

[group api]
dependencies = db
restart_mode = process

[process api web]
command = python -m http.server
output = file
output_max_bytes = 1024
output_max_files = 3
environment = APP_ENV=prod LC_ALL

[process db postgres]
path = bin/postgres
args = -D data
"#,
        )
        .unwrap();

        let api = &config.groups["api"];
        assert_eq!(api.restart_mode, RestartMode::Process);
        assert_eq!(api.dependencies, ["db"]);
        assert_eq!(api.restart_policy.max_restarts, Some(4));
        assert_eq!(api.restart_policy.restart_delay, Duration::from_millis(250));

        let web = &api.processes[0];
        assert_eq!(web.shell_command.as_deref(), Some("python -m http.server"));
        assert_eq!(web.environment.get("APP_ENV"), Some(&Some("prod".to_string())));
        assert_eq!(web.environment.get("LC_ALL"), Some(&None));
        assert_matches!(&web.output, OutputPolicy::File { path, .. } => {
            assert_eq!(path, Path::new("/srv/app/logs/api/web.log"));
        });

        // Implicitly created group with defaults applied through the set.
        let db = &config.groups["db"];
        assert_eq!(db.restart_policy.max_restarts, Some(4));
        assert_eq!(db.processes[0].arguments, ["-D", "data"]);
    }

    #[test]
    fn more_specific_layers_win() {
        let config = load_json(
            r#"{
                "defaults": {"max_restarts": 1, "restart_delay": "1s"},
                "sets": {
                    "all": {"groups": ["api"], "max_restarts": 2}
                },
                "groups": {
                    "api": {
                        "max_restarts": 3,
                        "processes": {"web": {"command": "true"}}
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.groups["api"].restart_policy.max_restarts, Some(3));
    }

    #[test]
    fn sets_merge_alphabetically() {
        let config = load_json(
            r#"{
                "sets": {
                    "beta": {"groups": ["api"], "max_restarts": 9},
                    "alpha": {"groups": ["api"], "max_restarts": 2, "restart_delay": "2s"}
                },
                "groups": {
                    "api": {"processes": {"web": {"command": "true"}}}
                }
            }"#,
        )
        .unwrap();

        // `beta` merges after `alpha`, so its budget wins, while alpha's
        // delay survives untouched.
        let policy = &config.groups["api"].restart_policy;
        assert_eq!(policy.max_restarts, Some(9));
        assert_eq!(policy.restart_delay, Duration::from_secs(2));
    }

    #[test]
    fn unlimited_restarts_override_a_numeric_default() {
        let config = load_json(
            r#"{
                "defaults": {"max_restarts": 3},
                "groups": {
                    "api": {
                        "max_restarts": "unlimited",
                        "processes": {"web": {"command": "true"}}
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.groups["api"].restart_policy.max_restarts, None);
    }

    #[test]
    fn set_names_expand_in_dependencies() {
        let config = load_json(
            r#"{
                "sets": {"backend": {"groups": ["db", "cache"]}},
                "groups": {
                    "db": {"processes": {"main": {"command": "true"}}},
                    "cache": {"processes": {"main": {"command": "true"}}},
                    "web": {
                        "dependencies": ["backend", "db"],
                        "processes": {"main": {"command": "true"}}
                    }
                }
            }"#,
        )
        .unwrap();

        // Expanded in declaration order, duplicates collapsed.
        assert_eq!(config.groups["web"].dependencies, ["db", "cache"]);
    }

    #[test]
    fn absolute_paths_are_left_alone() {
        let config = load_json(
            r#"{
                "groups": {
                    "api": {
                        "cwd": "/opt/run",
                        "processes": {"web": {"path": "/usr/bin/server"}}
                    }
                }
            }"#,
        )
        .unwrap();

        let web = &config.groups["api"].processes[0];
        assert_eq!(web.executable_path, Path::new("/usr/bin/server"));
        assert_eq!(web.working_directory, Path::new("/opt/run"));
    }

    #[rstest]
    #[case::both_command_and_path(
        r#"{"groups": {"g": {"processes": {"p": {"command": "true", "path": "bin/x"}}}}}"#
    )]
    #[case::command_with_args(
        r#"{"groups": {"g": {"processes": {"p": {"command": "true", "args": ["-v"]}}}}}"#
    )]
    fn conflicting_process_definitions_are_rejected(#[case] content: &str) {
        assert_matches!(load_json(content), Err(ConfigError::CommandConflict { key }) => {
            assert_eq!(key, "g/p");
        });
    }

    #[test]
    fn process_without_command_or_path_is_rejected() {
        let err = load_json(r#"{"groups": {"g": {"processes": {"p": {}}}}}"#).unwrap_err();
        assert_matches!(err, ConfigError::MissingCommand { key } => assert_eq!(key, "g/p"));
    }

    #[test]
    fn empty_group_is_rejected() {
        let err = load_json(r#"{"groups": {"g": {}}}"#).unwrap_err();
        assert_matches!(err, ConfigError::EmptyGroup { group } => assert_eq!(group, "g"));
    }

    #[test]
    fn set_with_unknown_member_is_rejected() {
        let err = load_json(r#"{"sets": {"s": {"groups": ["ghost"]}}, "groups": {}}"#).unwrap_err();
        assert_matches!(err, ConfigError::UnknownGroupInSet { set, group } => {
            assert_eq!((set.as_str(), group.as_str()), ("s", "ghost"));
        });
    }

    #[test]
    fn self_dependency_is_rejected() {
        let err = load_json(
            r#"{"groups": {"g": {"dependencies": ["g"], "processes": {"p": {"command": "true"}}}}}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::SelfDependency { group } => assert_eq!(group, "g"));
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let err = load_json(
            r#"{"groups": {
                "a": {"dependencies": ["b"], "processes": {"p": {"command": "true"}}},
                "b": {"dependencies": ["a"], "processes": {"p": {"command": "true"}}}
            }}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::Graph(_));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let err = load_json(
            r#"{"groups": {"a": {"dependencies": ["ghost"], "processes": {"p": {"command": "true"}}}}}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::Graph(_));
    }

    #[test]
    fn bad_restart_delay_is_rejected() {
        let err = load_json(
            r#"{"groups": {"g": {"restart_delay": "soon", "processes": {"p": {"command": "true"}}}}}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::InvalidValue { key, .. } => {
            assert_eq!(key, "restart_delay");
        });
    }

    #[test]
    fn rotation_without_file_budget_is_rejected() {
        let err = load_json(
            r#"{"groups": {"g": {"processes": {"p": {
                "command": "true", "output": "file",
                "output_max_bytes": 64, "output_max_files": 0
            }}}}}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::InvalidValue { key, .. } => {
            assert_eq!(key, "output_max_files");
        });
    }

    #[test]
    fn ini_unknown_section_is_rejected() {
        let err = load_ini("[mystery]\nkey = value\n").unwrap_err();
        assert_matches!(err, ConfigError::UnknownSection(section) => {
            assert_eq!(section, "mystery");
        });
    }

    #[test]
    fn ini_unknown_key_is_rejected() {
        let err = load_ini("[group api]\nfrequency = 12\n[process api web]\ncommand = true\n")
            .unwrap_err();
        assert_matches!(err, ConfigError::UnknownKey { key, .. } => {
            assert_eq!(key, "frequency");
        });
    }

    #[test]
    fn file_output_defaults_apply() {
        let config = load_json(
            r#"{"groups": {"api": {"processes": {"web": {
                "command": "true", "output": "file"
            }}}}}"#,
        )
        .unwrap();

        assert_matches!(&config.groups["api"].processes[0].output, OutputPolicy::File { path, max_bytes, max_files } => {
            assert_eq!(path, Path::new("/srv/app/logs/api/web.log"));
            assert_eq!(*max_bytes, 0);
            assert_eq!(*max_files, DEFAULT_OUTPUT_MAX_FILES);
        });
    }
}
