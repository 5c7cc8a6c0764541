//! GMAT installation discovery
//!
//! An explicit `[gmat] executable` wins. Otherwise the search root is walked
//! for any of the configured executable names and the most recently modified
//! match is used, so a fresh install shadows an old one.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::BatcherError;
use crate::config::defaults::{GMAT_OUTPUT_PATH_KEY, GMAT_STARTUP_FILE};
use crate::config::GmatConfig;

/// How deep below the search root executables are looked for.
const MAX_SEARCH_DEPTH: usize = 6;

/// `%LOCALAPPDATA%\GMAT` on Windows, `$HOME/GMAT` elsewhere.
pub fn default_search_root() -> Option<PathBuf> {
    std::env::var_os("LOCALAPPDATA")
        .or_else(|| std::env::var_os("HOME"))
        .map(|base| PathBuf::from(base).join("GMAT"))
}

fn collect_matches(dir: &Path, names: &[String], depth: usize, found: &mut Vec<(SystemTime, PathBuf)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if depth < MAX_SEARCH_DEPTH {
                collect_matches(&path, names, depth + 1, found);
            }
        } else if entry
            .file_name()
            .to_str()
            .is_some_and(|n| names.iter().any(|name| name == n))
        {
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            debug!(path = %path.display(), "GMAT executable candidate");
            found.push((mtime, path));
        }
    }
}

/// Newest file under `root` named like one of `names`.
pub fn find_executable(root: &Path, names: &[String]) -> Option<PathBuf> {
    let mut found = Vec::new();
    collect_matches(root, names, 0, &mut found);
    found.into_iter().max_by_key(|(mtime, _)| *mtime).map(|(_, path)| path)
}

/// Resolve the GMAT executable from configuration.
pub fn locate_executable(config: &GmatConfig) -> Result<PathBuf, BatcherError> {
    if let Some(explicit) = &config.executable {
        if explicit.is_file() {
            return Ok(explicit.clone());
        }
        return Err(BatcherError::ExecutableNotFound(format!(
            "configured path {} does not exist",
            explicit.display()
        )));
    }

    let root = config
        .search_root
        .clone()
        .or_else(default_search_root)
        .ok_or_else(|| BatcherError::ExecutableNotFound("no search root configured".to_string()))?;
    let executable = find_executable(&root, &config.executable_names).ok_or_else(|| {
        BatcherError::ExecutableNotFound(format!(
            "none of {:?} under {}",
            config.executable_names,
            root.display()
        ))
    })?;
    info!(path = %executable.display(), "Using GMAT executable");
    Ok(executable)
}

/// `OUTPUT_PATH` from the startup file next to `executable`, resolved
/// against the executable's directory when relative.
pub fn read_output_path(executable: &Path) -> Option<PathBuf> {
    let bin_dir = executable.parent()?;
    let startup = bin_dir.join(GMAT_STARTUP_FILE);
    let text = match std::fs::read_to_string(&startup) {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %startup.display(), error = %e, "No readable GMAT startup file");
            return None;
        }
    };

    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == GMAT_OUTPUT_PATH_KEY).then(|| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
        .map(|value| {
            let path = PathBuf::from(value);
            if path.is_absolute() {
                path
            } else {
                bin_dir.join(path)
            }
        })
}

/// Directory generated scripts and batch lists go to: the configured
/// `output_path`, else GMAT's own `OUTPUT_PATH`.
pub fn output_dir(config: &GmatConfig, executable: Option<&Path>) -> Option<PathBuf> {
    if let Some(configured) = &config.output_path {
        return Some(configured.clone());
    }
    let dir = executable.and_then(read_output_path);
    if dir.is_none() {
        warn!("No GMAT output directory configured or found in the startup file");
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["GMAT.exe".to_string(), "GmatConsole".to_string()]
    }

    #[test]
    fn test_find_executable_in_nested_install() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("R2022a").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("GmatConsole"), b"").unwrap();
        std::fs::write(bin.join("README.txt"), b"").unwrap();

        assert_eq!(find_executable(dir.path(), &names()), Some(bin.join("GmatConsole")));
        assert_eq!(find_executable(dir.path(), &["Other".to_string()]), None);
    }

    #[test]
    fn test_explicit_executable_must_exist() {
        let config = GmatConfig {
            executable: Some(PathBuf::from("/nonexistent/GMAT.exe")),
            ..GmatConfig::default()
        };
        assert!(matches!(
            locate_executable(&config),
            Err(BatcherError::ExecutableNotFound(_))
        ));
    }

    #[test]
    fn test_locate_under_search_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GMAT.exe"), b"").unwrap();
        let config = GmatConfig {
            search_root: Some(dir.path().to_path_buf()),
            executable_names: names(),
            ..GmatConfig::default()
        };
        assert_eq!(locate_executable(&config).unwrap(), dir.path().join("GMAT.exe"));
    }

    #[test]
    fn test_read_output_path_relative_to_bin() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("GMAT.exe");
        std::fs::write(&exe, b"").unwrap();
        std::fs::write(
            dir.path().join(GMAT_STARTUP_FILE),
            "# comment\nROOT_PATH = ../\nOUTPUT_PATH        = ../output/\n",
        )
        .unwrap();
        assert_eq!(read_output_path(&exe), Some(dir.path().join("../output/")));
    }

    #[test]
    fn test_configured_output_dir_wins() {
        let config = GmatConfig {
            output_path: Some(PathBuf::from("/data/gmat")),
            ..GmatConfig::default()
        };
        assert_eq!(output_dir(&config, None), Some(PathBuf::from("/data/gmat")));
        assert_eq!(output_dir(&GmatConfig::default(), None), None);
    }
}
