use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

const PARTIAL_HASH_LENGTH: usize = 1024; // 1KB

/// Cheap pre-filter hash over the first 1KB of a file. Two files with
/// different partial hashes cannot share a full fingerprint.
pub fn partial_hash(path: &Path) -> io::Result<u64> {
    let data = read_portion(path)?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&data);
    Ok(hasher.finish())
}

fn read_portion(path: &Path) -> io::Result<Vec<u8>> {
    let f = File::open(path)?;
    let mut buffer = Vec::with_capacity(PARTIAL_HASH_LENGTH);
    f.take(PARTIAL_HASH_LENGTH as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}
