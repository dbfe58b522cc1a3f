use crate::error::Error;
use glob::MatchOptions;
use std::env;
use std::path::PathBuf;
use tracing::trace;
use walkdir::WalkDir;

/// Expand one command-line pattern into concrete paths.
///
/// Patterns containing `[` or `]` are taken as literal file names; glob would
/// otherwise read the brackets as a character class. A match that is a
/// directory contributes every file beneath it.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let pattern = expand_home(pattern);

    if pattern.contains(['[', ']']) {
        trace!("Pattern '{}' taken literally", pattern);
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let entries = glob::glob_with(&pattern, options).map_err(|source| Error::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_dir() {
            for dir_entry in WalkDir::new(&path).follow_links(false) {
                let dir_entry = dir_entry?;
                if dir_entry.file_type().is_file() {
                    paths.push(dir_entry.into_path());
                }
            }
        } else {
            paths.push(path);
        }
    }

    trace!("Pattern '{}' matched {} paths", pattern, paths.len());
    Ok(paths)
}

fn expand_home(pattern: &str) -> String {
    let rest = match pattern.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return pattern.to_string(),
    };
    match env::var("HOME") {
        Ok(home) => format!("{}{}", home.trim_end_matches('/'), rest),
        Err(_) => pattern.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expand_glob_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("a.pdf"), b"a").unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("sub/c.pdf"), b"c").unwrap();
        fs::write(root.join("sub/deeper/d.pdf"), b"d").unwrap();

        let top = expand_pattern(&format!("{}/*.pdf", root.display())).unwrap();
        assert_eq!(top, vec![root.join("a.pdf")]);

        let mut all = expand_pattern(&format!("{}/**/*.pdf", root.display())).unwrap();
        all.sort();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&root.join("sub/deeper/d.pdf")));
    }

    #[test]
    fn test_directory_match_expands_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("corpus/nested")).unwrap();
        fs::write(root.join("corpus/one.pdf"), b"1").unwrap();
        fs::write(root.join("corpus/nested/two.pdf"), b"2").unwrap();

        let paths = expand_pattern(root.join("corpus").to_str().unwrap()).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_bracketed_pattern_is_literal() {
        let paths = expand_pattern("/tmp/report [draft].pdf").unwrap();
        assert_eq!(paths, vec![PathBuf::from("/tmp/report [draft].pdf")]);
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let err = expand_pattern("/tmp/***/x").unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_expand_home_only_touches_leading_tilde() {
        assert_eq!(expand_home("/data/~x"), "/data/~x");
        assert_eq!(expand_home("~user/x"), "~user/x");
        if let Ok(home) = env::var("HOME") {
            assert_eq!(
                expand_home("~/docs/*.pdf"),
                format!("{}/docs/*.pdf", home.trim_end_matches('/'))
            );
        }
    }
}
