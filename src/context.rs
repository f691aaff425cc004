use std::sync::Arc;

use crate::infra::artifacts::ArtifactStore;
use crate::services::{BoardDirectory, CardService};

#[derive(Clone)]
pub struct AppContext {
    pub directory: Arc<dyn BoardDirectory>,
    pub cards: Arc<dyn CardService>,
    pub artifacts: ArtifactStore,
}

impl AppContext {
    pub fn new(
        directory: Arc<dyn BoardDirectory>,
        cards: Arc<dyn CardService>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            directory,
            cards,
            artifacts,
        }
    }
}
