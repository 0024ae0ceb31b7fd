//! Sample configuration emission for `procvd sample-config`.

/// Commented INI sample; loads through the regular loader.
pub fn sample_ini() -> &'static str {
    r#"; procvd sample configuration (INI)
;
; Settings cascade: [defaults] -> [set ...] (alphabetical) -> [group ...]
; -> [process ...]; the most specific layer wins.

[defaults]
; restart the whole group when one process exits; `process` restarts
; only the process that exited
restart_mode = group
; a count, or `unlimited`
max_restarts = 5
restart_delay = 1s
environment = APP_ENV=dev

; group-sets bundle groups: usable in `dependencies`, and their settings
; apply to every member group
[set backend]
groups = db api

[group db]

[process db postgres]
path = bin/postgres
args = -D data

[group api]
dependencies = db

[process api web]
; `command` runs through the platform shell; use `path` + `args` to spawn
; an executable directly
command = python -m http.server 8080
; `file` appends stdout/stderr to <output_dir>/<group>/<process>.log and
; rotates it between runs
output = file
output_dir = logs
output_max_bytes = 1048576
output_max_files = 3
environment = APP_ENV=prod
"#
}

/// The same sample as JSON.
pub fn sample_json() -> &'static str {
    r#"{
  "defaults": {
    "restart_mode": "group",
    "max_restarts": 5,
    "restart_delay": "1s",
    "environment": {"APP_ENV": "dev"}
  },
  "sets": {
    "backend": {"groups": ["db", "api"]}
  },
  "groups": {
    "db": {
      "processes": {
        "postgres": {"path": "bin/postgres", "args": ["-D", "data"]}
      }
    },
    "api": {
      "dependencies": ["db"],
      "processes": {
        "web": {
          "command": "python -m http.server 8080",
          "output": "file",
          "output_dir": "logs",
          "output_max_bytes": 1048576,
          "output_max_files": 3,
          "environment": {"APP_ENV": "prod"}
        }
      }
    }
  }
}
"#
}
