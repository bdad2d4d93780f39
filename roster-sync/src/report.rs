//! Run reports: persisted [`ExecutionResult`]s.
//!
//! Apply runs are stored as pretty JSON at
//! `<home>/.roster/reports/<colegio_id>-<YYYYmmddTHHMMSS.mmmZ>.json`, with a
//! `-<n>` suffix when that name is already taken. Writes use the same atomic
//! `.tmp` + rename pattern as the profile.

use std::path::{Path, PathBuf};

use roster_core::config::roster_dir_at;

use crate::error::{io_err, SyncError};
use crate::result::ExecutionResult;

/// `<home>/.roster/reports/`: pure, no I/O.
pub fn reports_dir_at(home: &Path) -> PathBuf {
    roster_dir_at(home).join("reports")
}

/// Default report path for `result`, rooted at `home`.
pub fn report_path_at(home: &Path, result: &ExecutionResult) -> PathBuf {
    report_path_n(home, result, 0)
}

fn report_path_n(home: &Path, result: &ExecutionResult, n: usize) -> PathBuf {
    let stamp = result.started_at.format("%Y%m%dT%H%M%S%.3fZ");
    let name = match n {
        0 => format!("{}-{stamp}.json", result.colegio_id),
        n => format!("{}-{stamp}-{n}.json", result.colegio_id),
    };
    reports_dir_at(home).join(name)
}

/// Save `result` under the reports directory and return its path.
///
/// Never overwrites an earlier report.
pub fn save_at(home: &Path, result: &ExecutionResult) -> Result<PathBuf, SyncError> {
    let mut n = 0;
    let mut path = report_path_at(home, result);
    while path.exists() {
        n += 1;
        path = report_path_n(home, result, n);
    }
    write_to(&path, result)?;
    Ok(path)
}

/// Save `result` atomically at an explicit path.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn write_to(path: &Path, result: &ExecutionResult) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let json = serde_json::to_string_pretty(result)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("report written: {}", path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<ExecutionResult, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Most recent report by start time, or `None` when no report exists.
pub fn latest_at(home: &Path) -> Result<Option<(PathBuf, ExecutionResult)>, SyncError> {
    let dir = reports_dir_at(home);
    if !dir.exists() {
        return Ok(None);
    }
    let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
    let mut latest: Option<(PathBuf, ExecutionResult)> = None;
    for entry in entries {
        let path = entry.map_err(|e| io_err(&dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(result) = load(&path) else {
            tracing::warn!("skipping unreadable report {}", path.display());
            continue;
        };
        let newer = latest
            .as_ref()
            .map_or(true, |(_, best)| result.started_at > best.started_at);
        if newer {
            latest = Some((path, result));
        }
    }
    Ok(latest)
}
