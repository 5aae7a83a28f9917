//! Downloads a package version's archive.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::fetch::{Fetch, FetchError, fetch_with_timeout};
use crate::catalog::package::PackageVersion;

/// Errors that can occur during the download process.
#[derive(Debug, Error)]
pub enum DownloadError {
	/// Given version cannot be downloaded as it has no download location.
	#[error("given package does not have downloadable content.")]
	PackageMissingDownloadFields,
	/// The downloaded content hash does not match hash in the package.
	#[error("downloaded content hash {actual} does not match hash in package {expected}.")]
	DifferentHashes {
		expected: String,
		actual: String,
	},
	#[error("fetch error: {0}")]
	Fetch(#[from] FetchError),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
}

pub fn get_download_path(download_dir: &Path, version: &PackageVersion) -> PathBuf {
	download_dir.join(format!("{}-{}.archive", version.package, version.version))
}

/// Options controlling a download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
	pub download_dir: PathBuf,
	pub do_checksums: bool,
	pub timeout: std::time::Duration,
}

/// Downloads the archive of `version` into the download directory.
///
/// An archive already downloaded is reused as long as it still matches the published hash.
///
/// # Returns
/// Path of the archive on disk.
///
/// # Errors
/// - [`DownloadError::PackageMissingDownloadFields`] when the version has no location.
/// - [`DownloadError::DifferentHashes`] when checksums are enabled and the content doesn't match.
pub async fn download_package(options: &DownloadOptions, fetcher: &dyn Fetch, version: &PackageVersion) -> Result<PathBuf, DownloadError> {
	if version.url.is_empty() {
		return Err(DownloadError::PackageMissingDownloadFields);
	}

	let download_path = get_download_path(&options.download_dir, version);
	if let Ok(existing) = tokio::fs::read(&download_path).await {
		if !options.do_checksums || verify_checksum(version, &existing).is_ok() {
			log::info!("Package {} contents already downloaded, skipping.", version);
			return Ok(download_path);
		}
		log::warn!("Downloaded contents of {} do not match, downloading again.", version);
	}

	log::info!("Downloading package {} from {}", version, version.url);
	let content = fetch_with_timeout(fetcher, &version.url, options.timeout).await?;

	if options.do_checksums {
		verify_checksum(version, &content)?;
	}

	log::info!("Writing package download to disk: {}", version);
	tokio::fs::create_dir_all(download_path.with_file_name("")).await?;
	tokio::fs::write(&download_path, &content).await?;

	Ok(download_path)
}

fn verify_checksum(version: &PackageVersion, content: &[u8]) -> Result<(), DownloadError> {
	let Some(expected) = &version.sha256 else {
		return Ok(());
	};
	let actual = sha256::digest(content);
	if !actual.eq_ignore_ascii_case(expected.trim()) {
		return Err(DownloadError::DifferentHashes { expected: expected.clone(), actual });
	}
	Ok(())
}
