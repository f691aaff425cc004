use async_trait::async_trait;

use crate::error::AppResult;

/// Resolves human-readable board, list, label and member names to Trello ids.
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    /// `None` when no visible board carries `board_name`.
    async fn board_id(&self, board_name: &str) -> AppResult<Option<String>>;
    /// Fails with `NotFound` when the board has no list named `list_name`.
    async fn list_id(&self, board_id: &str, list_name: &str) -> AppResult<String>;
    async fn label_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>>;
    async fn member_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>>;
}
