use std::path::Path;

use async_trait::async_trait;

use crate::domain::ticket::{CardResponse, CardSummary, TicketPayload};
use crate::error::AppResult;

#[async_trait]
pub trait CardService: Send + Sync {
    async fn fetch_card(&self, card_ref: &str) -> AppResult<CardSummary>;
    async fn create_card(&self, payload: &TicketPayload) -> AppResult<CardResponse>;
    async fn update_card(&self, card_id: &str, payload: &TicketPayload)
    -> AppResult<CardResponse>;
    async fn attach_file(&self, card_id: &str, path: &Path) -> AppResult<()>;
}
