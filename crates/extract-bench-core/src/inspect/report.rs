use super::{DocumentInfo, Metadata};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

const FAILURE_PREFIX: &str = "Inspection failed:";
const FONT_SECTION_HEADER: &str = "Font subtypes:";

lazy_static! {
    static ref RE_INPUT: Regex = Regex::new(r"(?m)^\s*Input file:\s*(.*?)\s*$").unwrap();
    static ref RE_VERSION: Regex = Regex::new(r"PDF Version:[ \t]*(\d+\.\d+)?").unwrap();
    static ref RE_PAGES: Regex = Regex::new(r"Num Pages:\s*(\d+)").unwrap();
    static ref RE_ENCRYPTED: Regex = Regex::new(r"Is Encrypted:\s*(true|false)").unwrap();
    static ref RE_VIEWABLE: Regex =
        Regex::new(r"Is Viewable \(without pass\):\s*(true|false)").unwrap();
    static ref RE_FAILED: Regex = Regex::new(r"(?m)^Inspection failed:\s*(.*?)\s*$").unwrap();
    static ref RE_FONT_ROW: Regex = Regex::new(r"^\s*(\d+)[\s:.)]+(\S+)\s+(\d+)\s*$").unwrap();
}

/// Fields recognized in an inspector report. Each is independent: a missing
/// line leaves its field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionReport {
    pub input_file: Option<String>,
    pub version: Option<String>,
    pub pages: Option<u32>,
    pub encrypted: Option<bool>,
    pub viewable: Option<bool>,
    pub failure: Option<String>,
}

impl InspectionReport {
    pub fn parse(text: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };
        let flag = |re: &Regex| capture(re).map(|v| v == "true");

        Self {
            input_file: capture(&RE_INPUT).filter(|s| !s.is_empty()),
            version: capture(&RE_VERSION),
            pages: capture(&RE_PAGES).and_then(|p| p.parse().ok()),
            encrypted: flag(&RE_ENCRYPTED),
            viewable: flag(&RE_VIEWABLE),
            failure: capture(&RE_FAILED),
        }
    }

    /// Report text recorded for a document the inspector rejected.
    pub fn failure_text(reason: &str) -> String {
        format!("{} {}\n", FAILURE_PREFIX, reason)
    }

    /// Full metadata needs at least a version and a page count. Without an
    /// explicit flag a document counts as unencrypted, and as viewable
    /// unless encrypted.
    pub fn into_metadata(self, path: &Path, size: u64, fonts: BTreeMap<String, usize>) -> Metadata {
        match (self.failure, self.version, self.pages) {
            (None, Some(version), Some(pages)) => {
                let encrypted = self.encrypted.unwrap_or(false);
                Metadata::Full(DocumentInfo {
                    path: path.to_path_buf(),
                    size,
                    version,
                    pages,
                    encrypted,
                    viewable: self.viewable.unwrap_or(!encrypted),
                    fonts,
                })
            }
            _ => Metadata::SizeOnly {
                path: path.to_path_buf(),
                size,
            },
        }
    }
}

/// Parse the `Font subtypes:` section: one `<index> <subtype> <count>` row per
/// line until a blank line. No section means no fonts.
pub fn parse_font_report(text: &str) -> BTreeMap<String, usize> {
    let mut fonts = BTreeMap::new();
    let mut lines = text
        .lines()
        .skip_while(|line| !line.trim().eq_ignore_ascii_case(FONT_SECTION_HEADER));
    if lines.next().is_none() {
        return fonts;
    }
    for line in lines.take_while(|line| !line.trim().is_empty()) {
        if let Some(caps) = RE_FONT_ROW.captures(line) {
            let count: usize = caps[3].parse().unwrap_or(0);
            *fonts.entry(caps[2].to_string()).or_insert(0) += count;
        }
    }
    fonts
}

pub fn render_font_report(fonts: &BTreeMap<String, usize>) -> String {
    let mut out = String::from(FONT_SECTION_HEADER);
    out.push('\n');
    for (i, (subtype, count)) in fonts.iter().enumerate() {
        out.push_str(&format!("{:4} {} {}\n", i, subtype, count));
    }
    out
}
