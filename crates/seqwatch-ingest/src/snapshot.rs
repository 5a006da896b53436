//! Directory listing and set difference.
//!
//! Only the immediate regular-file children of the watched directory count;
//! subdirectories and their contents are never routed.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::Path;

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{IngestError, IngestResult};

/// Regular files directly inside a directory, split by whether their names decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// UTF-8 names; these are routed.
    pub files: BTreeSet<String>,
    /// Names that are not valid UTF-8; these can only be quarantined.
    pub undecodable: BTreeSet<OsString>,
}

/// List the regular files directly inside `dir`.
///
/// Symlinks are followed so a link to a file counts as a file. Entries that
/// vanish or cannot be inspected mid-listing are skipped with a warning.
///
/// # Errors
///
/// Returns [`IngestError::Snapshot`] when `dir` itself cannot be read.
pub fn list_entries(dir: &Path) -> IngestResult<Listing> {
    let mut listing = Listing::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(IngestError::Snapshot {
                    path: dir.to_path_buf(),
                    source,
                });
            }
            Err(error) => {
                warn!(error = %error, dir = %dir.display(), "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => {
                listing.files.insert(name.to_string());
            }
            None => {
                listing.undecodable.insert(entry.file_name().to_os_string());
            }
        }
    }
    Ok(listing)
}

/// Names of the regular files directly inside `dir` that are valid UTF-8.
///
/// # Errors
///
/// Returns [`IngestError::Snapshot`] when `dir` itself cannot be read.
pub fn list_files(dir: &Path) -> IngestResult<BTreeSet<String>> {
    list_entries(dir).map(|listing| listing.files)
}

/// Names present in `current` but not in `previous`, in sorted order.
#[must_use]
pub fn diff(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> Vec<String> {
    current.difference(previous).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqwatch_test_support::fixtures::temp_dir;
    use std::fs;

    #[test]
    fn list_files_ignores_directories_and_nested_files() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        fs::write(temp.path().join("b_two.txt"), "b")?;
        fs::write(temp.path().join("a_one.txt"), "a")?;
        fs::create_dir(temp.path().join("nested_dir"))?;
        fs::write(temp.path().join("nested_dir").join("c_three.txt"), "c")?;

        let names: Vec<String> = list_files(temp.path())?.into_iter().collect();
        assert_eq!(names, vec!["a_one.txt".to_string(), "b_two.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn list_files_fails_for_missing_directory() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let missing = temp.path().join("missing");
        let err = list_files(&missing).err();
        assert!(matches!(err, Some(IngestError::Snapshot { ref path, .. }) if path == &missing));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn list_files_skips_dangling_symlinks() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        fs::write(temp.path().join("real_file.txt"), "x")?;
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling_link"))?;

        let names = list_files(temp.path())?;
        assert_eq!(names.len(), 1);
        assert!(names.contains("real_file.txt"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn list_entries_separates_undecodable_names() -> anyhow::Result<()> {
        use std::os::unix::ffi::OsStrExt;

        let temp = temp_dir()?;
        let raw = std::ffi::OsStr::from_bytes(b"bad\xffname");
        fs::write(temp.path().join(raw), "x")?;
        fs::write(temp.path().join("good_name.txt"), "y")?;

        let listing = list_entries(temp.path())?;
        assert_eq!(listing.files.len(), 1);
        assert!(listing.files.contains("good_name.txt"));
        assert_eq!(listing.undecodable.len(), 1);
        assert!(listing.undecodable.contains(raw));
        Ok(())
    }

    #[test]
    fn diff_reports_only_additions() {
        let previous: BTreeSet<String> = ["a_1", "b_2"].iter().map(ToString::to_string).collect();
        let current: BTreeSet<String> = ["b_2", "d_4", "c_3"].iter().map(ToString::to_string).collect();
        assert_eq!(diff(&previous, &current), vec!["c_3".to_string(), "d_4".to_string()]);
        assert!(diff(&current, &previous).contains(&"a_1".to_string()));
        assert!(diff(&current, &current).is_empty());
    }
}
