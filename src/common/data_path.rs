// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "DATA_DIR";

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn env_data_dir() -> Option<String> {
    std::env::var(DATA_DIR_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the data directory:
/// 1) explicit setting, then `DATA_DIR`
/// 2) `../data` next to the executable, if present
/// 3) `./data`
pub fn resolve_data_dir(explicit_data_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit_data_dir
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .or_else(env_data_dir)
    {
        return absolute(PathBuf::from(dir));
    }
    if let Some(exe_data) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("..").join("data")))
        && exe_data.exists()
    {
        return absolute(exe_data);
    }
    absolute(PathBuf::from("data"))
}

/// Absolute paths are kept; relative ones are anchored in the data directory
/// (a leading `data/` component is not repeated).
pub fn resolve_data_path(raw_path: &str, explicit_data_dir: Option<&str>) -> PathBuf {
    let as_path = PathBuf::from(raw_path);
    if as_path.is_absolute() {
        return as_path;
    }
    let relative = as_path
        .strip_prefix("data")
        .map(Path::to_path_buf)
        .unwrap_or(as_path);
    resolve_data_dir(explicit_data_dir).join(relative)
}

pub fn resolve_required_data_path(
    raw_path: &str,
    explicit_data_dir: Option<&str>,
) -> Result<PathBuf, AppError> {
    let resolved = resolve_data_path(raw_path, explicit_data_dir);
    if resolved.exists() {
        return Ok(resolved);
    }
    Err(AppError::Config(format!(
        "expected {} at {}; set DATA_DIR or an absolute path",
        raw_path,
        resolved.display()
    )))
}
