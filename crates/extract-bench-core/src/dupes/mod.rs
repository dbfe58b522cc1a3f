pub mod index;
pub mod quarantine;

pub use index::{DuplicateGroup, DuplicateIndex};
pub use quarantine::{quarantine, quarantine_all, QuarantineOutcome, QuarantinePolicy};
