//! Package staging.
//!
//! This module verifies that the target package is present and intact:
//! - On the orchestrating machine before a copy
//! - Under the remote staging path before an install
//!
//! Confirmed checksums are kept in a process-wide [`HashCache`].

mod cache;
mod stager;

pub use cache::{HashCache, LOCALHOST_SCOPE};
pub use stager::{PackageStager, PackageStatus, target_package};
