mod diff;

pub use diff::{DiffSource, GitDiff};

#[cfg(test)]
pub use diff::MockDiffSource;
