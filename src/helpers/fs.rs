//! File System Utilities
//!
//! Configuration and data directory management, plus export file writing.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "churn-preview", "churn-preview").ok_or_else(|| Error::Invalid {
        message: "Could not determine project directories".to_string(),
    })
}

/// Get or create the application's configuration directory
///
/// Platform-specific locations:
/// - **Linux**: `~/.config/churn-preview/` or `$XDG_CONFIG_HOME/churn-preview/`
/// - **macOS**: `~/Library/Application Support/com.churn-preview.churn-preview/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\churn-preview\churn-preview\config\`
pub fn get_or_create_config_dir() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let config_dir = project_dirs.config_dir();

    if !config_dir.exists() {
        fs::create_dir_all(config_dir)?;
    }

    Ok(config_dir.to_path_buf())
}

/// Get or create the data directory (used for file logs)
///
/// Platform-specific locations:
/// - **Linux**: `~/.local/share/churn-preview/`
/// - **macOS**: `~/Library/Application Support/com.churn-preview.churn-preview/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\churn-preview\churn-preview\data\`
pub fn get_or_create_data_dir() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let data_dir = project_dirs.data_dir();

    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }

    Ok(data_dir.to_path_buf())
}

/// Reduce a server-suggested file name to a single safe path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        "export.xlsx".to_string()
    } else {
        cleaned
    }
}

/// Write an export payload into `dir`, returning the final path
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let path = dir.join(sanitize_file_name(file_name));
    fs::write(&path, bytes)?;
    Ok(path)
}
