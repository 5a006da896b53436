//! Run-directory allocation, quarantine naming, and file moves.
//!
//! # Design
//! - Run directories are claimed with `create_dir`, so two allocations can
//!   never share a directory even within one second.
//! - Moves never overwrite: an occupied destination is a relocation failure.
//! - Cross-device moves fall back to copy followed by removal of the source.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{IngestError, IngestResult};

/// Number of candidate names tried before giving up on a run or quarantine target.
pub const MAX_NAME_ATTEMPTS: usize = 100;

/// Timestamp layout embedded in run directory names.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Source of wall-clock time for run naming.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

fn candidate_name(base: &str, attempt: usize, separator: char) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}{separator}{attempt}")
    }
}

/// Create a fresh run directory `<prefix>_<timestamp>` under `root`.
///
/// When the name is taken, `_1`, `_2`, ... are appended until a directory can
/// be created.
///
/// # Errors
///
/// Returns [`IngestError::CollisionExhausted`] after [`MAX_NAME_ATTEMPTS`]
/// taken names, or [`IngestError::Relocation`] when creation fails for any
/// other reason.
pub fn allocate_run_dir(root: &Path, prefix: &str, at: DateTime<Local>) -> IngestResult<PathBuf> {
    let base = format!("{prefix}_{}", at.format(RUN_TIMESTAMP_FORMAT));
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = root.join(candidate_name(&base, attempt, '_'));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(IngestError::relocation("allocate_run_dir", candidate, err)),
        }
    }
    Err(IngestError::CollisionExhausted {
        base: root.join(base),
        attempts: MAX_NAME_ATTEMPTS,
    })
}

/// First free path for `name` inside `error_dir`: `name`, then `name.1`, `name.2`, ...
///
/// # Errors
///
/// Returns [`IngestError::CollisionExhausted`] when every candidate exists.
pub fn quarantine_target(error_dir: &Path, name: &str) -> IngestResult<PathBuf> {
    (0..MAX_NAME_ATTEMPTS)
        .map(|attempt| error_dir.join(candidate_name(name, attempt, '.')))
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
        .ok_or_else(|| IngestError::CollisionExhausted {
            base: error_dir.join(name),
            attempts: MAX_NAME_ATTEMPTS,
        })
}

/// Move `source` to `destination`, which must not exist yet.
///
/// # Errors
///
/// Returns [`IngestError::Relocation`] if the destination is occupied or the
/// file cannot be renamed, copied or cleaned up.
pub fn move_file(source: &Path, destination: &Path) -> IngestResult<()> {
    if fs::symlink_metadata(destination).is_ok() {
        return Err(IngestError::relocation(
            "move_file.destination_exists",
            destination,
            io::Error::from(io::ErrorKind::AlreadyExists),
        ));
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) if rename_err.kind() == io::ErrorKind::NotFound => Err(
            IngestError::relocation("move_file.rename", source, rename_err),
        ),
        Err(_rename_err) => {
            fs::copy(source, destination)
                .map_err(|err| IngestError::relocation("move_file.copy", destination, err))?;
            fs::remove_file(source)
                .map_err(|err| IngestError::relocation("move_file.cleanup", source, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use seqwatch_test_support::fixtures::{dir_names, temp_dir};

    fn fixed_time() -> anyhow::Result<DateTime<Local>> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous fixture time"))
    }

    #[test]
    fn allocate_run_dir_appends_suffix_on_collision() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let at = fixed_time()?;

        let first = allocate_run_dir(temp.path(), "sample", at)?;
        let second = allocate_run_dir(temp.path(), "sample", at)?;
        let third = allocate_run_dir(temp.path(), "sample", at)?;

        assert_eq!(first, temp.path().join("sample_20240309-140507"));
        assert_eq!(second, temp.path().join("sample_20240309-140507_1"));
        assert_eq!(third, temp.path().join("sample_20240309-140507_2"));
        assert_eq!(dir_names(temp.path())?.len(), 3);
        Ok(())
    }

    #[test]
    fn allocate_run_dir_gives_up_after_max_attempts() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let at = fixed_time()?;
        for _ in 0..MAX_NAME_ATTEMPTS {
            allocate_run_dir(temp.path(), "busy", at)?;
        }
        let err = allocate_run_dir(temp.path(), "busy", at).err();
        assert!(matches!(
            err,
            Some(IngestError::CollisionExhausted { attempts, .. }) if attempts == MAX_NAME_ATTEMPTS
        ));
        Ok(())
    }

    #[test]
    fn quarantine_target_skips_existing_names() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        assert_eq!(quarantine_target(temp.path(), "readme.txt")?, temp.path().join("readme.txt"));

        fs::write(temp.path().join("readme.txt"), "old")?;
        fs::write(temp.path().join("readme.txt.1"), "older")?;
        assert_eq!(
            quarantine_target(temp.path(), "readme.txt")?,
            temp.path().join("readme.txt.2")
        );
        Ok(())
    }

    #[test]
    fn move_file_relocates_and_refuses_overwrite() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let source = temp.path().join("sample_a.txt");
        let destination = temp.path().join("a.txt");
        fs::write(&source, "payload")?;

        move_file(&source, &destination)?;
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination)?, "payload");

        fs::write(&source, "second")?;
        let err = move_file(&source, &destination).err();
        assert!(matches!(
            err,
            Some(IngestError::Relocation { operation: "move_file.destination_exists", .. })
        ));
        assert_eq!(fs::read_to_string(&destination)?, "payload");
        assert!(source.exists());
        Ok(())
    }

    #[test]
    fn move_file_reports_missing_source() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let err = move_file(&temp.path().join("gone_x"), &temp.path().join("x")).err();
        assert!(matches!(
            err,
            Some(IngestError::Relocation { operation: "move_file.rename", .. })
        ));
        Ok(())
    }
}
