//! # Source Archive
//!
//! Packs the vendor tree into `<project>-<version>-source.tar.gz`. The vendor
//! tree becomes the top-level `<project>-<version>/` directory and any
//! auxiliary build files present in the output directory (`requirements.txt`,
//! `setup.py`, ...) are added at its root.
//!
//! Archives are reproducible: entries are added in sorted path order with
//! zeroed timestamps and owners, and the gzip header carries no mtime. The
//! archive is written to a temporary file next to its final path and renamed
//! into place once complete.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use tar::{EntryType, Header};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::config::VendorConfig;
use crate::error::{Error, Result};
use crate::manifest::is_plain_name;

/// File name of the archive for `version`.
pub fn archive_name(project: &str, version: &str) -> String {
    format!("{project}-{version}-source.tar.gz")
}

/// Build the source archive in `config.output_dir` and return its path.
pub fn create_source_archive(config: &VendorConfig, version: &str) -> Result<PathBuf> {
    if !is_plain_name(version) {
        return Err(Error::InvalidVersion {
            version: version.to_string(),
        });
    }
    if !config.vendor_dir.is_dir() {
        return Err(Error::VendorTreeMissing {
            path: config.vendor_dir.clone(),
        });
    }

    let name = archive_name(&config.project_name, version);
    let archive_path = config.output_dir.join(&name);
    let prefix = PathBuf::from(format!("{}-{}", config.project_name, version));
    info!("Creating source tarball: {}", name);

    fs::create_dir_all(&config.output_dir)
        .map_err(|e| Error::filesystem("create", &config.output_dir, e))?;
    let temp = NamedTempFile::new_in(&config.output_dir)
        .map_err(|e| Error::filesystem("create", &config.output_dir, e))?;

    let encoder = GzEncoder::new(temp.as_file(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    append_tree(&mut builder, &config.vendor_dir, &prefix)?;
    for aux in &config.aux_files {
        let path = config.output_dir.join(aux);
        if path.is_file() {
            append_file(&mut builder, &path, &prefix.join(aux))?;
        }
    }

    builder.into_inner()?.finish()?;
    temp.as_file().sync_all()?;
    temp.persist(&archive_path)
        .map_err(|e| Error::filesystem("replace", &archive_path, e.error))?;

    let size = fs::metadata(&archive_path)?.len();
    info!(
        "Source tarball created: {} ({:.1} MB)",
        name,
        size as f64 / (1024.0 * 1024.0)
    );
    Ok(archive_path)
}

fn append_tree<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    prefix: &Path,
) -> Result<()> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = prefix.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let mut header = base_header(EntryType::Directory, 0o755);
            builder.append_data(&mut header, &name, std::io::empty())?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|e| Error::filesystem("read", path, e))?;
            let mut header = base_header(EntryType::Symlink, 0o777);
            builder.append_link(&mut header, &name, &target)?;
        } else if file_type.is_file() {
            append_file(builder, path, &name)?;
        }
    }
    Ok(())
}

fn append_file<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    path: &Path,
    name: &Path,
) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| Error::filesystem("read", path, e))?;
    let mode = if is_executable(&metadata) { 0o755 } else { 0o644 };
    let mut header = base_header(EntryType::Regular, mode);
    header.set_size(metadata.len());

    let file = File::open(path).map_err(|e| Error::filesystem("open", path, e))?;
    builder.append_data(&mut header, name, file)?;
    Ok(())
}

fn base_header(entry_type: EntryType, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_size(0);
    header
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}
