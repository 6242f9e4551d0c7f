//! The Scribe write algorithm: stat, roll on overflow, append, newline.
//! Runs exclusively on the pipeline's single consumer thread.

use protocol::error::ClusterError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MODULE: &str = "fs_writer";

/// Resolves `<rootPath>/<path>/<filename>.log`, creating the parent
/// directory tree if it does not yet exist.
pub fn log_path(root_path: &str, path: &str, filename: &str) -> Result<PathBuf, ClusterError> {
    let mut dir = PathBuf::from(root_path);
    if !path.is_empty() {
        dir.push(path);
    }
    fs::create_dir_all(&dir)
        .map_err(|e| ClusterError::disk(format!("cannot create directory '{}': {e}", dir.display()), MODULE))?;
    Ok(dir.join(format!("{filename}.log")))
}

/// Renames the active file to `<filename>_<timestamp>.log` if it exists
/// and has reached `max_size`. The sentinel `max_size == -1` disables
/// rollover unconditionally.
fn roll_if_needed(log_path: &Path, filename: &str, max_size: i64) -> Result<(), ClusterError> {
    if max_size < 0 {
        return Ok(());
    }
    let metadata = match fs::metadata(log_path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ClusterError::disk(format!("cannot stat '{}': {e}", log_path.display()), MODULE)),
    };

    if (metadata.len() as i64) < max_size {
        return Ok(());
    }

    let timestamp = chrono::Local::now().format("%Y%m%dT%H%M%S%3f").to_string();
    let rolled_name = format!("{filename}_{timestamp}.log");
    let rolled_path = log_path.with_file_name(rolled_name);
    fs::rename(log_path, &rolled_path).map_err(|e| {
        ClusterError::disk(
            format!("cannot roll '{}' to '{}': {e}", log_path.display(), rolled_path.display()),
            MODULE,
        )
    })
}

/// Appends `line` to the active file for `(path, filename)` under
/// `root_path`, rolling it over first if it has reached `max_size`.
/// Ensures the written line is newline-terminated.
pub fn write_line(root_path: &str, path: &str, filename: &str, line: &[u8], max_size: i64) -> Result<(), ClusterError> {
    let target = log_path(root_path, path, filename)?;
    roll_if_needed(&target, filename, max_size)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&target)
        .map_err(|e| ClusterError::disk(format!("cannot open '{}': {e}", target.display()), MODULE))?;

    file.write_all(line)
        .map_err(|e| ClusterError::disk(format!("short write to '{}': {e}", target.display()), MODULE))?;
    if !line.ends_with(b"\n") {
        file.write_all(b"\n")
            .map_err(|e| ClusterError::disk(format!("short write to '{}': {e}", target.display()), MODULE))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_to_string;

    fn temp_root(name: &str) -> String {
        let dir = format!("{}/scribe_fs_writer_{name}", std::env::temp_dir().display());
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn single_write_creates_file_with_newline() {
        let root = temp_root("single_write");
        write_line(&root, "p", "a", b"hello", -1).unwrap();
        let contents = read_to_string(log_path(&root, "p", "a").unwrap()).unwrap();
        assert_eq!(contents, "hello\n");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn concatenation_law_holds_for_sequential_writes() {
        let root = temp_root("concat");
        write_line(&root, "p", "a", b"one", -1).unwrap();
        write_line(&root, "p", "a", b"two\n", -1).unwrap();
        write_line(&root, "p", "a", b"three", -1).unwrap();
        let contents = read_to_string(log_path(&root, "p", "a").unwrap()).unwrap();
        assert_eq!(contents, "one\ntwo\nthree\n");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn rollover_preserves_prior_content_and_starts_fresh_file() {
        let root = temp_root("rollover");
        write_line(&root, "p", "a", b"0123456789", 10).unwrap();
        write_line(&root, "p", "a", b"abc", 10).unwrap();

        let active = read_to_string(log_path(&root, "p", "a").unwrap()).unwrap();
        assert_eq!(active, "abc\n");

        let rolled: Vec<_> = fs::read_dir(format!("{root}/p"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("a_") )
            .collect();
        assert_eq!(rolled.len(), 1);
        let rolled_contents = read_to_string(rolled[0].path()).unwrap();
        assert_eq!(rolled_contents, "0123456789\n");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn sentinel_disables_rollover() {
        let root = temp_root("sentinel");
        for _ in 0..5 {
            write_line(&root, "p", "a", b"0123456789", -1).unwrap();
        }
        let contents = read_to_string(log_path(&root, "p", "a").unwrap()).unwrap();
        assert_eq!(contents.lines().count(), 5);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn empty_path_writes_directly_under_root() {
        let root = temp_root("empty_path");
        write_line(&root, "", "a", b"hello", -1).unwrap();
        let contents = read_to_string(log_path(&root, "", "a").unwrap()).unwrap();
        assert_eq!(contents, "hello\n");
        fs::remove_dir_all(&root).unwrap();
    }
}
