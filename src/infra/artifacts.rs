use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::ticket::CardResponse;
use crate::error::AppResult;

const BASE_FOLDER_NAME: &str = "trello-blueprints";
const RESPONSES_FOLDER_NAME: &str = "responses";

/// Local folder receiving one JSON file per API response.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    responses_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates `<root>/trello-blueprints/responses` if it does not exist yet.
    pub fn init(root: &Path) -> AppResult<Self> {
        let responses_dir = root.join(BASE_FOLDER_NAME).join(RESPONSES_FOLDER_NAME);
        fs::create_dir_all(&responses_dir)?;
        debug!(dir = %responses_dir.display(), "artifact folders ready");
        Ok(Self { responses_dir })
    }

    pub fn responses_dir(&self) -> &Path {
        &self.responses_dir
    }

    pub fn write_response(&self, file_name: &str, card: &CardResponse) -> AppResult<PathBuf> {
        let path = self.responses_dir.join(file_name);
        let data = serde_json::to_string_pretty(card.body())?;
        fs::write(&path, data)?;
        Ok(path)
    }
}
