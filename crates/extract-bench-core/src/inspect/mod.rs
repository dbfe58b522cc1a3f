//! Document metadata: the inspector collaborator traits, report parsing, and
//! the on-disk report cache.

pub mod report;
pub mod store;
pub mod tool;

use crate::tools::ToolError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use report::{parse_font_report, render_font_report, InspectionReport};
pub use store::{InspectOutcome, MetadataStore};
pub use tool::{ToolFontInspector, ToolInspector};

const MB: f64 = 1024.0 * 1024.0;

#[derive(Error, Debug)]
pub enum InspectError {
    /// The tool ran and rejected the file. Cached like a success.
    #[error("inspection failed: {0}")]
    Failed(String),

    /// The tool could not be run at all. Not cached, retried next run.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Produces the line-oriented metadata report for a document.
pub trait MetadataInspector: Send + Sync {
    fn inspect(&self, path: &Path) -> Result<String, InspectError>;
}

/// Produces the font-subtype report for a document.
pub trait FontInspector: Send + Sync {
    fn fonts(&self, path: &Path) -> Result<String, InspectError>;
}

/// Metadata of a successfully inspected document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub size: u64,
    pub version: String,
    pub pages: u32,
    pub encrypted: bool,
    pub viewable: bool,
    pub fonts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Full(DocumentInfo),
    /// Inspection failed or the report lacked a version or page count.
    SizeOnly { path: PathBuf, size: u64 },
}

impl Metadata {
    pub fn is_good(&self) -> bool {
        matches!(self, Metadata::Full(_))
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        match self {
            Metadata::Full(info) => Some(info),
            Metadata::SizeOnly { .. } => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Metadata::Full(info) => &info.path,
            Metadata::SizeOnly { path, .. } => path,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Metadata::Full(info) => info.size,
            Metadata::SizeOnly { size, .. } => *size,
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Full(info) => write!(
                f,
                "[{}] {:5.3} MB {:3} pages",
                info.version,
                info.size as f64 / MB,
                info.pages
            ),
            Metadata::SizeOnly { size, .. } => {
                write!(f, "INVALID {:5.3} MB", *size as f64 / MB)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_summaries() {
        let full = Metadata::Full(DocumentInfo {
            path: PathBuf::from("/c/a.pdf"),
            size: 1024 * 1024,
            version: "1.5".to_string(),
            pages: 12,
            encrypted: false,
            viewable: true,
            fonts: BTreeMap::new(),
        });
        assert_eq!(full.to_string(), "[1.5] 1.000 MB  12 pages");
        assert!(full.is_good());

        let failed = Metadata::SizeOnly {
            path: PathBuf::from("/c/b.pdf"),
            size: 0,
        };
        assert!(failed.to_string().starts_with("INVALID"));
        assert!(failed.info().is_none());
        assert_eq!(failed.path(), Path::new("/c/b.pdf"));
    }
}
