//! Storage access used by the render pipeline.
//!
//! Everything the pipeline does to disk goes through [`Storage`], so a build
//! can be pointed at something other than the real filesystem.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// A directory entry returned by [`Storage::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name (UTF-8)
    pub name: String,

    /// Full path
    pub path: PathBuf,

    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl DirEntry {
    /// Hidden entries start with a dot.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Narrow filesystem interface for the render pipeline.
pub trait Storage: Send + Sync {
    /// Read a file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read a file as bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a file. Either the whole content lands or the previous file
    /// (if any) is left untouched.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// List the immediate children of a directory.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Modification time of a file, `None` if it does not exist.
    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;

    /// Create a directory and all of its parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Check whether a path is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// [`Storage`] on the local filesystem.
///
/// Directory listings are sorted by file name. Writes go to a temporary file
/// in the target directory which is then renamed over the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;

        // temp files are created owner-only; published pages must be world-readable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::other)?;
            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!("Skipping non UTF-8 path: {}", entry.path().display());
                continue;
            };

            entries.push(DirEntry {
                name: name.to_string(),
                path: entry.path().to_path_buf(),
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(entries)
    }

    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        match fs::metadata(path) {
            Ok(meta) => meta.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_entries_sorted_by_name() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.md"), "b").unwrap();
        fs::write(temp.path().join("a.md"), "a").unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();

        let entries = FsStorage.list_dir(temp.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["a.md", "b.md", "c"]);
        assert!(entries[2].is_dir);
        assert!(!entries[0].is_dir);
    }

    #[test]
    fn write_replaces_existing_file() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("page.html");

        FsStorage.write(&target, b"first").unwrap();
        FsStorage.write(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        // only the target remains, no stray temp files
        assert_eq!(FsStorage.list_dir(temp.path()).unwrap().len(), 1);
    }

    #[test]
    fn modified_is_none_for_missing_file() {
        let temp = tempdir().unwrap();

        assert_eq!(FsStorage.modified(&temp.path().join("nope")).unwrap(), None);

        fs::write(temp.path().join("yes"), "x").unwrap();
        assert!(FsStorage.modified(&temp.path().join("yes")).unwrap().is_some());
    }

    #[test]
    fn listing_missing_directory_fails() {
        let temp = tempdir().unwrap();

        assert!(FsStorage.list_dir(&temp.path().join("missing")).is_err());
    }
}
