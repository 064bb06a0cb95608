use std::path::{Path, PathBuf};
use std::{env, fs, io};

use log::{info, warn};

/// Reads every `.txt` document of a corpus directory.
///
/// - Files are read in name order so training is reproducible
/// - Contents are trimmed; empty documents are skipped
/// - Unreadable files are logged and skipped
pub(crate) fn read_corpus<P: AsRef<Path>>(dir: P) -> io::Result<Vec<String>> {
	let folder = normalize_folder(dir.as_ref());
	let mut documents = Vec::new();

	for file in list_files(&folder, "txt")? {
		let path = folder.join(&file);
		match fs::read_to_string(&path) {
			Ok(text) if !text.trim().is_empty() => documents.push(text.trim().to_owned()),
			Ok(_) => (),
			Err(e) => warn!("Failed to read {}: {e}", path.display()),
		}
	}

	info!("Read {} documents from {}", documents.len(), folder.display());
	Ok(documents)
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder(input: &Path) -> PathBuf {
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory, sorted by name.
///
/// Returns file names only (no paths).
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}
