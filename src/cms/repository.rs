//! Flat-directory document storage.
//!
//! All documents are sibling files in a single directory:
//! ```text
//! <DATA_DIR>/
//!   about.md
//!   changes.txt
//!   logo.png
//! ```
//!
//! Writes go to a uniquely named hidden temp file first and are renamed into
//! place, so a reader never sees a partially written document and concurrent
//! writers to one name never share a temp file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur during repository operations.
#[derive(Debug)]
pub enum RepositoryError {
    /// No document with this name.
    NotFound(String),
    /// Name would escape the flat directory or be hidden.
    InvalidName(String),
    /// Underlying storage error.
    IoFailure(PathBuf, io::Error),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::NotFound(name) => write!(f, "{} does not exist.", name),
            RepositoryError::InvalidName(name) => write!(f, "Invalid document name: {}", name),
            RepositoryError::IoFailure(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::IoFailure(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Document storage over a single directory.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    data_dir: PathBuf,
}

impl DocumentRepository {
    /// Creates a repository over `data_dir`. The directory is not touched
    /// until [`ensure_dir`](Self::ensure_dir) or a write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Creates the data directory if needed.
    pub fn ensure_dir(&self) -> Result<(), RepositoryError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| RepositoryError::IoFailure(self.data_dir.clone(), e))
    }

    /// Validates a document name to keep every document inside the data
    /// directory.
    ///
    /// Dots inside a name are fine (`v1..2.md`); separators, a leading dot
    /// (which also covers `.` and `..`) and control characters are not.
    pub fn validate_name(name: &str) -> Result<(), RepositoryError> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control)
        {
            return Err(RepositoryError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Returns the on-disk path of a document, after validating its name.
    ///
    /// The file may not exist.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, RepositoryError> {
        Self::validate_name(name)?;
        Ok(self.data_dir.join(name))
    }

    /// Returns true if a document named `name` exists.
    pub fn exists(&self, name: &str) -> Result<bool, RepositoryError> {
        Ok(self.path_of(name)?.is_file())
    }

    /// Lists document names, sorted.
    ///
    /// Hidden files (including in-flight temp files) and subdirectories are
    /// skipped.
    pub fn list(&self) -> Result<Vec<String>, RepositoryError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::IoFailure(self.data_dir.clone(), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepositoryError::IoFailure(self.data_dir.clone(), e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| RepositoryError::IoFailure(entry.path(), e))?
                .is_file();
            if !is_file {
                continue;
            }

            // Non UTF-8 names can't be addressed through the web layer.
            if let Ok(name) = entry.file_name().into_string() {
                if !name.starts_with('.') {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Reads the raw bytes of a document.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, RepositoryError> {
        let path = self.path_of(name)?;

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RepositoryError::NotFound(name.to_string()))
            }
            Err(e) => Err(RepositoryError::IoFailure(path, e)),
        }
    }

    /// Creates or fully replaces a document.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        let path = self.path_of(name)?;
        let mut staged = self.stage()?;
        staged
            .write_all(bytes)
            .map_err(|e| RepositoryError::IoFailure(staged.path().to_path_buf(), e))?;
        Self::commit(staged, path)
    }

    /// Removes a document.
    pub fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        let path = self.path_of(name)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RepositoryError::NotFound(name.to_string()))
            }
            Err(e) => Err(RepositoryError::IoFailure(path, e)),
        }
    }

    /// Writes `content`, already read from `source` by the caller, to `dest`.
    pub fn copy(&self, source: &str, dest: &str, content: &[u8]) -> Result<(), RepositoryError> {
        tracing::debug!("Copying {} to {}", source, dest);
        self.write(dest, content)
    }

    /// Moves a staged upload into the repository as `filename`.
    ///
    /// Existing documents with the same name are overwritten. No filename
    /// rules apply beyond staying inside the data directory.
    pub fn store_upload(&self, filename: &str, staged: &Path) -> Result<(), RepositoryError> {
        let path = self.path_of(filename)?;
        let mut temp = self.stage()?;
        let mut source = fs::File::open(staged)
            .map_err(|e| RepositoryError::IoFailure(staged.to_path_buf(), e))?;
        io::copy(&mut source, &mut temp)
            .map_err(|e| RepositoryError::IoFailure(temp.path().to_path_buf(), e))?;
        Self::commit(temp, path)
    }

    /// Opens a fresh temp file inside the data directory. Its name starts
    /// with a dot, so [`list`](Self::list) never shows it.
    fn stage(&self) -> Result<NamedTempFile, RepositoryError> {
        self.ensure_dir()?;
        NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| RepositoryError::IoFailure(self.data_dir.clone(), e))
    }

    fn commit(staged: NamedTempFile, path: PathBuf) -> Result<(), RepositoryError> {
        staged
            .as_file()
            .sync_all()
            .map_err(|e| RepositoryError::IoFailure(staged.path().to_path_buf(), e))?;
        staged
            .persist(&path)
            .map_err(|e| RepositoryError::IoFailure(path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (DocumentRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = DocumentRepository::new(temp_dir.path().join("data"));
        (repo, temp_dir)
    }

    #[test]
    fn test_validate_name() {
        // Valid
        assert!(DocumentRepository::validate_name("about.md").is_ok());
        assert!(DocumentRepository::validate_name("my notes.txt").is_ok());
        assert!(DocumentRepository::validate_name("changes").is_ok());
        assert!(DocumentRepository::validate_name("v1..2.md").is_ok());

        // Invalid
        assert!(DocumentRepository::validate_name("").is_err());
        assert!(DocumentRepository::validate_name("../users.yml").is_err());
        assert!(DocumentRepository::validate_name("foo/bar.md").is_err());
        assert!(DocumentRepository::validate_name("foo\\bar.md").is_err());
        assert!(DocumentRepository::validate_name(".hidden.md").is_err());
        assert!(DocumentRepository::validate_name("..").is_err());
        assert!(DocumentRepository::validate_name("a\nb.md").is_err());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let (repo, _temp) = setup();
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_sorted_and_skips_hidden_and_dirs() {
        let (repo, _temp) = setup();
        repo.write("changes.txt", b"").unwrap();
        repo.write("about.md", b"").unwrap();
        std::fs::write(repo.data_dir.join(".tmpAbC123"), b"partial").unwrap();
        std::fs::create_dir(repo.data_dir.join("nested")).unwrap();

        assert_eq!(repo.list().unwrap(), vec!["about.md", "changes.txt"]);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (repo, _temp) = setup();
        let bytes: Vec<u8> = (0..=255).collect();

        repo.write("bytes.txt", &bytes).unwrap();

        assert_eq!(repo.read("bytes.txt").unwrap(), bytes);
    }

    #[test]
    fn test_write_replaces_content() {
        let (repo, _temp) = setup();
        repo.write("changes.txt", b"a much longer original body").unwrap();
        repo.write("changes.txt", b"new content").unwrap();

        assert_eq!(repo.read("changes.txt").unwrap(), b"new content");
        assert_eq!(repo.list().unwrap(), vec!["changes.txt"]);
    }

    #[test]
    fn test_read_missing() {
        let (repo, _temp) = setup();
        let err = repo.read("notafile.ext").unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(ref n) if n == "notafile.ext"));
        assert_eq!(err.to_string(), "notafile.ext does not exist.");
    }

    #[test]
    fn test_read_rejects_traversal() {
        let (repo, temp) = setup();
        std::fs::write(temp.path().join("users.yml"), b"secret").unwrap();

        let err = repo.read("../users.yml").unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidName(_)));
    }

    #[test]
    fn test_delete_twice_fails() {
        let (repo, _temp) = setup();
        repo.write("test.txt", b"").unwrap();

        repo.delete("test.txt").unwrap();
        assert!(!repo.exists("test.txt").unwrap());

        let err = repo.delete("test.txt").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn test_copy_writes_supplied_content() {
        let (repo, _temp) = setup();
        repo.write("test.txt", b"original").unwrap();

        repo.copy("test.txt", "test_copy.txt", b"edited before copy")
            .unwrap();

        assert_eq!(repo.read("test.txt").unwrap(), b"original");
        assert_eq!(repo.read("test_copy.txt").unwrap(), b"edited before copy");
    }

    #[test]
    fn test_store_upload_overwrites() {
        let (repo, temp) = setup();
        repo.write("logo.png", b"old").unwrap();

        let staged = temp.path().join("upload.bin");
        std::fs::write(&staged, b"\x89PNG\r\n").unwrap();

        repo.store_upload("logo.png", &staged).unwrap();

        assert_eq!(repo.read("logo.png").unwrap(), b"\x89PNG\r\n");
        assert!(staged.exists());
    }

    #[test]
    fn test_store_upload_missing_staged_file() {
        let (repo, temp) = setup();

        let err = repo
            .store_upload("logo.png", &temp.path().join("gone.bin"))
            .unwrap_err();

        assert!(matches!(err, RepositoryError::IoFailure(_, _)));
    }

    #[test]
    fn test_concurrent_writes_to_one_name() {
        let (repo, _temp) = setup();
        let big_a = vec![b'a'; 1024 * 1024];
        let big_b = vec![b'b'; 1024 * 1024];

        for _ in 0..10 {
            std::thread::scope(|scope| {
                let a = scope.spawn(|| repo.write("x.txt", &big_a));
                let b = scope.spawn(|| repo.write("x.txt", &big_b));
                a.join().unwrap().unwrap();
                b.join().unwrap().unwrap();
            });

            let content = repo.read("x.txt").unwrap();
            assert!(content == big_a || content == big_b);
        }

        assert_eq!(repo.list().unwrap(), vec!["x.txt"]);
    }
}
