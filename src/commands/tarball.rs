//! # Tarball Command Implementation
//!
//! `--tarball VERSION` packs the vendor directory into
//! `<project>-<VERSION>-source.tar.gz` in the output directory.

use anyhow::Result;
use vendorize::archive;
use vendorize::config::VendorConfig;
use vendorize::output::{self, OutputConfig};

pub fn execute(config: &VendorConfig, version: &str, out: &OutputConfig) -> Result<()> {
    let path = archive::create_source_archive(config, version)?;
    println!("{}", output::render_written(out, "Source tarball", &path));
    Ok(())
}
