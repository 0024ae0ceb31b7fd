//! Start-of-run rotation of process log files.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Applies the rotation policy to `path` before a process run.
///
/// Rotation only ever happens here, before the child is spawned, so no
/// running process can be left holding a handle to a renamed file.
///
/// With `max_files` total files (active included) and `A = max_files - 1`
/// archives, existing archives shift `<log>.i` -> `<log>.(i+1)` from the
/// oldest kept slot down, then the active file becomes `<log>.1`. A
/// `max_files` of 1 truncates in place; a `max_bytes` of 0 disables
/// rotation entirely.
pub fn rotate_at_start(path: &Path, max_bytes: u64, max_files: u32) -> io::Result<()> {
    if max_bytes == 0 {
        return Ok(());
    }
    let length = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if length <= max_bytes {
        return Ok(());
    }

    if max_files <= 1 {
        OpenOptions::new().write(true).truncate(true).open(path)?;
        return Ok(());
    }

    let archives = max_files - 1;
    for index in (1..archives).rev() {
        let from = archive_path(path, index);
        if from.exists() {
            let to = archive_path(path, index + 1);
            let _ = fs::remove_file(&to);
            fs::rename(&from, &to)?;
        }
    }
    let first = archive_path(path, 1);
    let _ = fs::remove_file(&first);
    fs::rename(path, &first)?;
    Ok(())
}

fn archive_path(path: &Path, index: u32) -> PathBuf {
    let mut archived = path.as_os_str().to_owned();
    archived.push(format!(".{index}"));
    PathBuf::from(archived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn missing_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        rotate_at_start(&dir.path().join("absent.log"), 64, 2).unwrap();
    }

    #[test]
    fn zero_max_bytes_disables_rotation() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        write(&log, &"x".repeat(256));

        rotate_at_start(&log, 0, 2).unwrap();

        assert_eq!(read(&log).len(), 256);
        assert!(!archive_path(&log, 1).exists());
    }

    #[test]
    fn file_within_limit_is_untouched() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        write(&log, "short");

        rotate_at_start(&log, 64, 2).unwrap();

        assert_eq!(read(&log), "short");
        assert!(!archive_path(&log, 1).exists());
    }

    #[test]
    fn single_file_policy_truncates() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        write(&log, &"x".repeat(256));

        rotate_at_start(&log, 64, 1).unwrap();

        assert_eq!(read(&log), "");
    }

    #[test]
    fn oversized_file_becomes_first_archive() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        write(&log, &"x".repeat(256));

        rotate_at_start(&log, 64, 2).unwrap();

        assert!(!log.exists());
        assert_eq!(read(&archive_path(&log, 1)).len(), 256);
    }

    #[test]
    fn archives_shift_and_the_oldest_is_dropped() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        write(&log, &"new".repeat(40));
        write(&archive_path(&log, 1), "archive-1");
        write(&archive_path(&log, 2), "archive-2");

        rotate_at_start(&log, 64, 3).unwrap();

        // archive-2 fell off the end; archive-1 moved up; the active file
        // became the first archive.
        assert_eq!(read(&archive_path(&log, 2)), "archive-1");
        assert_eq!(read(&archive_path(&log, 1)), "new".repeat(40));
        assert!(!log.exists());
    }

    #[test]
    fn repeated_runs_never_exceed_the_file_budget() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");

        for run in 0..6 {
            write(&log, &format!("run-{run}").repeat(40));
            rotate_at_start(&log, 64, 3).unwrap();
        }

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(files.len() <= 3, "expected at most 3 files, got {files:?}");
        assert!(archive_path(&log, 1).exists());
        assert!(archive_path(&log, 2).exists());
    }
}
