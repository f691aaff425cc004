use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    Exact,
    Regex,
}

/// Where the files to attach to a card come from.
#[derive(Debug, Clone)]
pub struct AttachmentSource {
    pub file_name: String,
    pub folder: String,
    pub match_type: MatchType,
}

impl AttachmentSource {
    /// Local paths to upload, one per attachment.
    pub fn resolve(&self) -> AppResult<Vec<PathBuf>> {
        match self.match_type {
            MatchType::Exact => Ok(vec![combine_folder_and_file(&self.folder, &self.file_name)]),
            MatchType::Regex => {
                let pattern = Regex::new(&self.file_name).map_err(|err| {
                    AppError::InvalidInput(format!(
                        "invalid file name pattern '{}': {err}",
                        self.file_name
                    ))
                })?;
                let root = if self.folder.is_empty() {
                    Path::new(".")
                } else {
                    Path::new(&self.folder)
                };
                let mut files = collect_files(root)?;
                files.retain(|path| pattern.is_match(&path.to_string_lossy()));
                files.sort();
                Ok(files)
            }
        }
    }
}

fn combine_folder_and_file(folder: &str, file_name: &str) -> PathBuf {
    if folder.is_empty() {
        PathBuf::from(file_name)
    } else {
        Path::new(folder).join(file_name)
    }
}

/// Regular files under `dir`. Symlinked directories are not followed.
fn collect_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
