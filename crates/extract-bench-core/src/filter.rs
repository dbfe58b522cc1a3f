use crate::inspect::Metadata;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// How `min_version` is compared against a document's version string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// `major.minor` compared as numbers, so `1.10` is newer than `1.3`.
    /// Strings that do not parse fall back to lexicographic order.
    #[default]
    Numeric,
    /// Plain string order, so `1.10` sorts before `1.3`.
    Lexicographic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min_version: Option<String>,
    pub version_policy: VersionPolicy,
    pub max_pages: Option<u32>,
    pub reject_encrypted: bool,
    pub require_viewable: bool,
    pub reject_font_subtypes: BTreeSet<String>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_version: Some("1.3".to_string()),
            version_policy: VersionPolicy::default(),
            max_pages: Some(100),
            reject_encrypted: true,
            require_viewable: true,
            reject_font_subtypes: BTreeSet::new(),
        }
    }
}

impl Constraints {
    /// Accept everything that inspected cleanly.
    pub fn permissive() -> Self {
        Self {
            min_version: None,
            version_policy: VersionPolicy::default(),
            max_pages: None,
            reject_encrypted: false,
            require_viewable: false,
            reject_font_subtypes: BTreeSet::new(),
        }
    }

    pub fn wants_fonts(&self) -> bool {
        !self.reject_font_subtypes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("inspection failed")]
    InspectionFailed,
    #[error("encrypted")]
    Encrypted,
    #[error("not viewable without password")]
    NotViewable,
    #[error("version {version} older than {min_version}")]
    VersionTooOld { version: String, min_version: String },
    #[error("{pages} pages exceeds {max_pages}")]
    TooManyPages { pages: u32, max_pages: u32 },
    #[error("contains {subtype} fonts")]
    DisallowedFont { subtype: String },
}

/// Counter key for a rejection, without its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectionKind {
    InspectionFailed,
    Encrypted,
    NotViewable,
    VersionTooOld,
    TooManyPages,
    DisallowedFont,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::InspectionFailed => RejectionKind::InspectionFailed,
            Rejection::Encrypted => RejectionKind::Encrypted,
            Rejection::NotViewable => RejectionKind::NotViewable,
            Rejection::VersionTooOld { .. } => RejectionKind::VersionTooOld,
            Rejection::TooManyPages { .. } => RejectionKind::TooManyPages,
            Rejection::DisallowedFont { .. } => RejectionKind::DisallowedFont,
        }
    }
}

impl RejectionKind {
    pub const ALL: [RejectionKind; 6] = [
        RejectionKind::InspectionFailed,
        RejectionKind::Encrypted,
        RejectionKind::NotViewable,
        RejectionKind::VersionTooOld,
        RejectionKind::TooManyPages,
        RejectionKind::DisallowedFont,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RejectionKind::InspectionFailed => "inspection failed",
            RejectionKind::Encrypted => "encrypted",
            RejectionKind::NotViewable => "not viewable",
            RejectionKind::VersionTooOld => "version too old",
            RejectionKind::TooManyPages => "too many pages",
            RejectionKind::DisallowedFont => "disallowed font",
        }
    }

    /// Log marker, matching the markers of the per-file progress lines.
    pub fn marker(&self) -> &'static str {
        match self {
            RejectionKind::TooManyPages => "**+",
            _ => "**-",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check `metadata` against every constraint, reporting the first that fails.
pub fn accept(metadata: &Metadata, constraints: &Constraints) -> Result<(), Rejection> {
    let info = metadata.info().ok_or(Rejection::InspectionFailed)?;

    if constraints.reject_encrypted && info.encrypted {
        return Err(Rejection::Encrypted);
    }
    if constraints.require_viewable && !info.viewable {
        return Err(Rejection::NotViewable);
    }
    if let Some(min_version) = &constraints.min_version {
        if compare_versions(&info.version, min_version, constraints.version_policy) == Ordering::Less {
            return Err(Rejection::VersionTooOld {
                version: info.version.clone(),
                min_version: min_version.clone(),
            });
        }
    }
    if let Some(max_pages) = constraints.max_pages {
        if info.pages > max_pages {
            return Err(Rejection::TooManyPages {
                pages: info.pages,
                max_pages,
            });
        }
    }
    if let Some(subtype) = info
        .fonts
        .keys()
        .find(|subtype| constraints.reject_font_subtypes.contains(*subtype))
    {
        return Err(Rejection::DisallowedFont {
            subtype: subtype.clone(),
        });
    }
    Ok(())
}

pub fn accepts(metadata: &Metadata, constraints: &Constraints) -> bool {
    accept(metadata, constraints).is_ok()
}

pub fn compare_versions(version: &str, other: &str, policy: VersionPolicy) -> Ordering {
    match policy {
        VersionPolicy::Lexicographic => version.cmp(other),
        VersionPolicy::Numeric => match (parse_version(version), parse_version(other)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => version.cmp(other),
        },
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
