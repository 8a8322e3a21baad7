//! A flat directory of game files addressed by bare file name.

use std::error::Error as StdError;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from the file store.
#[derive(Debug)]
pub enum StoreError {
    /// No file name was given.
    MissingName,
    /// The name could escape the store directory.
    InvalidName(String),
    /// There is no such file, or the store directory does not exist.
    NotFound(String),
    /// An upload carried no content.
    EmptyContent,
    /// An export found no files to return.
    NoFiles,
    Io(io::Error),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> StoreError {
        StoreError::Io(err)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StoreError::MissingName => f.write_str("Missing file parameter"),
            StoreError::InvalidName(_) => f.write_str("Invalid filename"),
            StoreError::NotFound(ref name) => write!(f, "File not found: {}", name),
            StoreError::EmptyContent => f.write_str("No file content provided"),
            StoreError::NoFiles => f.write_str("No files found"),
            StoreError::Io(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            StoreError::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One stored file as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Local modification time, `YYYY-MM-DD HH:MM:SS`.
    pub modified: String,
}

/// A listed file together with its Base64-encoded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    #[serde(flatten)]
    pub entry: FileEntry,
    pub content: String,
}

/// Every stored file in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub success: bool,
    pub timestamp: String,
    pub files: Vec<ExportedFile>,
}

/// Acknowledgement of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub success: bool,
    pub message: String,
    pub file: String,
    pub size: u64,
    pub timestamp: String,
}

/// Checks that `name` is a bare file name.
pub fn sanitize(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(StoreError::MissingName);
    }
    if name.contains("..") || name.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists regular files by name. A store directory that does not exist yet is empty.
    pub fn list(&self) -> Result<Vec<FileEntry>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for item in dir {
            let item = item?;
            let meta = item.metadata()?;
            if !meta.is_file() {
                continue;
            }
            entries.push(FileEntry {
                name: item.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                modified: format_time(meta.modified()?),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Streams the named file into `out` and returns the number of bytes copied.
    pub fn download<W: Write>(&self, name: &str, out: &mut W) -> Result<u64> {
        let path = self.root.join(sanitize(name)?);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if !file.metadata()?.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let copied = io::copy(&mut file, out)?;
        tracing::debug!(file = name, bytes = copied, "downloaded");
        Ok(copied)
    }

    /// Replaces the named file with `content`, creating the store directory if needed.
    pub fn upload(&self, name: &str, content: &[u8]) -> Result<UploadReceipt> {
        let name = sanitize(name)?;
        if content.is_empty() {
            return Err(StoreError::EmptyContent);
        }
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, content)?;
        let meta = fs::metadata(&path)?;
        tracing::info!(file = name, size = meta.len(), "uploaded");
        Ok(UploadReceipt {
            success: true,
            message: format!("File '{}' uploaded successfully", name),
            file: name.to_string(),
            size: meta.len(),
            timestamp: format_time(meta.modified()?),
        })
    }

    /// Returns every file with its content.
    pub fn export_all(&self) -> Result<Export> {
        if !self.root.is_dir() {
            return Err(StoreError::NotFound(self.root.display().to_string()));
        }
        let mut files = Vec::new();
        for entry in self.list()? {
            let content = match fs::read(self.root.join(&entry.name)) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %entry.name, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            files.push(ExportedFile {
                entry,
                content: STANDARD.encode(content),
            });
        }
        if files.is_empty() {
            return Err(StoreError::NoFiles);
        }
        Ok(Export {
            success: true,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            files,
        })
    }
}
