pub mod digest;
pub mod partial;

pub use digest::{fingerprint, fingerprint_bytes, ContentFingerprint, SHORT_FINGERPRINT_LEN};
pub use partial::partial_hash;
