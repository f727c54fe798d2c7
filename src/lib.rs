// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # junos-ops
//!
//! Software lifecycle and configuration push orchestration for fleets of
//! Junos devices.
//!
//! ## Overview
//!
//! junos-ops drives the same sequence an operator would run by hand on each
//! device, across many devices in parallel:
//!
//! - Stage a checksum-verified package and install it with validation
//! - Compare running, pending and planned versions and roll back on request
//! - Re-validate a staged package when the configuration changed after
//!   install, then schedule the reboot
//! - Push set commands with commit confirmed and a health check before the
//!   final commit
//! - Collect support information and the set-format configuration
//!
//! ## Modules
//!
//! - [`config`]: Inventory parsing, validation and target selection
//! - [`device`]: Device session traits and the simulated transport
//! - [`version`]: Version ordering, probing and reporting
//! - [`package`]: Package verification and the hash cache
//! - [`lifecycle`]: Copy, install, rollback, drift and reboot
//! - [`commit`]: Configuration push transaction and health check
//! - [`fleet`]: Worker pool and per-host workflows
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! defaults:
//!   user: admin
//!   hash_algorithm: md5
//!   packages:
//!     ex2300-24t:
//!       file: junos-arm-32-22.4R3-S6.5.tgz
//!       hash: e3b0c44298fc1c149afbf4c8996fb924
//!
//! hosts:
//!   - name: sw1
//!     tags: [tokyo, access]
//!   - name: sw2
//!     host: 192.0.2.12
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod commit;
pub mod config;
pub mod device;
pub mod error;
pub mod fleet;
pub mod lifecycle;
pub mod package;
pub mod version;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use commit::{ConfigPush, HealthCheck, PushOptions, PushOutcome};
pub use config::{ConfigValidator, HostDescriptor, Inventory, InventoryParser};
pub use device::{DeviceConnector, DeviceSession, SimulatedDevice, SimulatorConnector};
pub use error::{JunosOpsError, Result};
pub use fleet::{FleetExecutor, FleetReport, HostResult, Operation, WorkflowContext};
pub use lifecycle::{Installer, LifecycleOptions, LifecycleOutcome};
pub use package::{HashCache, PackageStager, PackageStatus};
pub use version::{VersionOrdering, compare_version};
