use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a record file could not be turned into a usable [`Record`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed DVK encoding: {0}")]
    MalformedEncoding(#[from] serde_json::Error),
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("Field {0} must be a relative path")]
    AbsolutePath(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// One DVK metadata record.
///
/// Keys this type doesn't know about are kept in `extra` and written back by
/// [`Record::to_json`], so newer files survive a rename pass untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub time: String,
    pub web_tags: Vec<String>,
    pub description: String,
    pub page_url: String,
    pub direct_url: String,
    pub media_file: String,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub secondary_file: Option<String>,
    pub favorites: Vec<String>,
    pub is_single: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl Record {
    /// Decode and validate a record.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let record = Self::decode(raw)?;
        record.validate()?;
        Ok(record)
    }

    /// Decode without checking required fields. Only fails on bad encoding.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Read and decode a record file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Self::decode(&raw)
    }

    /// Report the first required field that is missing or empty.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ParseError::MissingRequiredField("id"));
        }
        if self.title.trim().is_empty() {
            return Err(ParseError::MissingRequiredField("title"));
        }
        if self.media_file.is_empty() {
            return Err(ParseError::MissingRequiredField("media_file"));
        }
        if Path::new(&self.media_file).is_absolute() {
            return Err(ParseError::AbsolutePath("media_file"));
        }
        if let Some(secondary) = &self.secondary_file {
            if Path::new(secondary).is_absolute() {
                return Err(ParseError::AbsolutePath("secondary_file"));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Absolute paths of the media file and, if any, the secondary file.
    ///
    /// Both are joined onto `containing_dir` and normalized lexically; the
    /// filesystem is never touched.
    pub fn resolve_media_paths(&self, containing_dir: &Path) -> (PathBuf, Option<PathBuf>) {
        let media = normalize(&containing_dir.join(&self.media_file));
        let secondary = self
            .secondary_file
            .as_ref()
            .map(|s| normalize(&containing_dir.join(s)));
        (media, secondary)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Drop `.` components and fold `..` into their parent without consulting
/// the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
