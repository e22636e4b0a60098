//! # CLI Command Implementations
//!
//! One module per action of the `vendorize` command line. Each exposes an
//! `execute` function taking the run's `VendorConfig` and calling into the
//! `vendorize` library for the actual work.

pub mod clean;
pub mod lock;
pub mod sync;
pub mod tarball;
