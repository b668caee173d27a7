//! On-disk migration scripts.
//!
//! A migration `<name>` is stored as `<name>.sql` with an optional reverse
//! script `<name>.down.sql` next to it.

use super::error::MigrationError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const UP_SUFFIX: &str = ".sql";
const DOWN_SUFFIX: &str = ".down.sql";

/// A directory of migration scripts.
#[derive(Debug, Clone)]
pub struct MigrationFiles {
    dir: PathBuf,
}

impl MigrationFiles {
    /// Open a migrations directory. It is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the up script.
    pub fn up_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, UP_SUFFIX))
    }

    /// Path of the down script.
    pub fn down_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, DOWN_SUFFIX))
    }

    /// Check if a migration's up script exists.
    pub fn exists(&self, name: &str) -> bool {
        self.up_path(name).is_file()
    }

    /// Write a migration, returning the path of the up script.
    pub fn write(&self, name: &str, up: &str, down: Option<&str>) -> Result<PathBuf, MigrationError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.up_path(name);
        fs::write(&path, up)?;
        if let Some(down) = down.filter(|d| !d.trim().is_empty()) {
            fs::write(self.down_path(name), down)?;
        }
        tracing::info!(migration = name, path = %path.display(), "migration written");
        Ok(path)
    }

    /// Names of all migrations, sorted.
    ///
    /// A missing directory holds no migrations.
    pub fn list(&self) -> Result<Vec<String>, MigrationError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.ends_with(DOWN_SUFFIX) {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(UP_SUFFIX) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read a migration's up script.
    pub fn load_up(&self, name: &str) -> Result<String, MigrationError> {
        match fs::read_to_string(self.up_path(name)) {
            Ok(sql) => Ok(sql),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(MigrationError::MigrationNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a migration's down script, if it has one.
    pub fn load_down(&self, name: &str) -> Result<Option<String>, MigrationError> {
        match fs::read_to_string(self.down_path(name)) {
            Ok(sql) => Ok(Some(sql)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_list() {
        let tmp = TempDir::new().unwrap();
        let files = MigrationFiles::new(tmp.path().join("migrations"));
        assert!(files.list().unwrap().is_empty());

        files.write("Version2", "SELECT 2;\n", None).unwrap();
        files
            .write("Version1", "SELECT 1;\n", Some("DROP TABLE x;\n"))
            .unwrap();
        std::fs::write(files.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(files.list().unwrap(), vec!["Version1", "Version2"]);
        assert_eq!(files.load_up("Version1").unwrap(), "SELECT 1;\n");
        assert_eq!(files.load_down("Version1").unwrap().as_deref(), Some("DROP TABLE x;\n"));
        assert_eq!(files.load_down("Version2").unwrap(), None);
        assert!(files.exists("Version2"));
    }

    #[test]
    fn test_missing_migration() {
        let tmp = TempDir::new().unwrap();
        let files = MigrationFiles::new(tmp.path());
        assert!(matches!(
            files.load_up("Nope"),
            Err(MigrationError::MigrationNotFound(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_blank_down_script_is_not_written() {
        let tmp = TempDir::new().unwrap();
        let files = MigrationFiles::new(tmp.path());
        files.write("V", "SELECT 1;", Some("  \n")).unwrap();
        assert!(!files.down_path("V").exists());
    }
}
