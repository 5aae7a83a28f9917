//! Package archive extraction.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
	/// The archive is neither a zip nor a gzip compressed tar.
	#[error("package uses an unsupported content type.")]
	UnsupportedContentType,
	/// An entry would be written outside the package directory.
	#[error("archive entry \"{0}\" escapes the package directory.")]
	UnsafeEntryPath(String),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
	Zip,
	TarGz,
}

impl ContentType {
	/// Identifies an archive from its first bytes.
	pub fn sniff(header: &[u8]) -> Option<ContentType> {
		if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
			Some(ContentType::Zip)
		} else if header.starts_with(&[0x1f, 0x8b]) {
			Some(ContentType::TarGz)
		} else {
			None
		}
	}
}

/// Extracts an archive into `destination`, creating it and any directories inside as needed.
///
/// # Errors
/// - [`ContentError::UnsupportedContentType`] when the archive format isn't recognised.
/// - [`ContentError::UnsafeEntryPath`] when an entry is absolute or climbs out with `..`.
/// Anything written before the error is left in place.
pub fn extract_archive(archive: &Path, destination: &Path) -> Result<(), ContentError> {
	let mut header = [0u8; 4];
	let read = {
		use std::io::Read;
		std::fs::File::open(archive)?.read(&mut header)?
	};

	std::fs::create_dir_all(destination)?;
	match ContentType::sniff(&header[..read]) {
		Some(ContentType::Zip) => extract_zip(archive, destination),
		Some(ContentType::TarGz) => extract_tar_gz(archive, destination),
		None => Err(ContentError::UnsupportedContentType),
	}
}

fn extract_zip(archive: &Path, destination: &Path) -> Result<(), ContentError> {
	let mut zip = zip::ZipArchive::new(
		std::fs::File::open(archive)?
	)?;

	/* Every name is checked before anything is written */
	let mut targets = Vec::<PathBuf>::with_capacity(zip.len());
	for i in 0..zip.len() {
		let entry = zip.by_index(i)?;
		let relative = entry.enclosed_name()
			.map(Path::to_path_buf)
			.ok_or_else(|| ContentError::UnsafeEntryPath(entry.name().to_string()))?;
		targets.push(destination.join(relative));
	}

	for (i, target) in targets.into_iter().enumerate() {
		let mut entry = zip.by_index(i)?;
		if entry.is_dir() {
			std::fs::create_dir_all(&target)?;
			continue;
		}
		std::fs::create_dir_all(target.with_file_name(""))?;
		let mut file = std::fs::File::create(&target)?;
		std::io::copy(&mut entry, &mut file)?;
	}
	Ok(())
}

fn extract_tar_gz(archive: &Path, destination: &Path) -> Result<(), ContentError> {
	let gz = flate2::read::GzDecoder::new(
		std::fs::File::open(archive)?
	);
	let mut tar = tar::Archive::new(gz);

	for entry in tar.entries()? {
		let mut entry = entry?;
		let path = entry.path()?.into_owned();
		let relative = enclosed_path(&path)
			.ok_or_else(|| ContentError::UnsafeEntryPath(path.display().to_string()))?;
		let target = destination.join(relative);

		match entry.header().entry_type() {
			tar::EntryType::Directory => {
				std::fs::create_dir_all(&target)?;
			},
			tar::EntryType::Regular | tar::EntryType::Continuous => {
				std::fs::create_dir_all(target.with_file_name(""))?;
				entry.unpack(&target)?;
			},
			other => log::warn!("Skipping archive entry {} of type {:?}", path.display(), other),
		}
	}
	Ok(())
}

/// `path` with `.` components dropped, `None` if it is absolute or contains `..`.
fn enclosed_path(path: &Path) -> Option<PathBuf> {
	let mut enclosed = PathBuf::new();
	for component in path.components() {
		match component {
			Component::Normal(part) => enclosed.push(part),
			Component::CurDir => {},
			Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
		}
	}
	(!enclosed.as_os_str().is_empty()).then_some(enclosed)
}
