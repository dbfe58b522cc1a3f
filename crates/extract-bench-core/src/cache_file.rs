use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

/// Write `contents` to `dest` through a temporary file in the same directory,
/// so readers never see a partially written cache file.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Move a finished file into place unless something is already there.
/// Returns `false` when `dest` existed; `source` is removed either way.
pub fn publish_no_clobber(source: &Path, dest: &Path) -> io::Result<bool> {
    let tmp = TempPath::try_from_path(source)?;
    match tmp.persist_noclobber(dest) {
        Ok(()) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}
