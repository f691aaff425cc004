use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::attachment::AttachmentSource;
use crate::domain::ticket::{CardResponse, TicketFields, TicketPayload};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOperation {
    Create,
    Update,
}

impl TicketOperation {
    pub fn artifact_name(&self, card_id: &str) -> String {
        let prefix = match self {
            TicketOperation::Create => "create_ticket",
            TicketOperation::Update => "update_ticket",
        };
        format!("{prefix}_{card_id}_response.json")
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTicketRequest {
    pub board_name: String,
    pub list_name: String,
    pub fields: TicketFields,
    pub members: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub attachment: Option<AttachmentSource>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTicketRequest {
    /// Shortlink or id of the card to update.
    pub card_ref: String,
    pub board_name: Option<String>,
    pub list_name: Option<String>,
    pub fields: TicketFields,
    pub members: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub custom_fields: Option<Map<String, Value>>,
    pub attachment: Option<AttachmentSource>,
}

#[derive(Debug, Default)]
pub struct AttachmentReport {
    pub attached: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug)]
pub struct TicketWorkflowOutcome {
    pub operation: TicketOperation,
    pub card: CardResponse,
    pub response_path: PathBuf,
    pub attachments: AttachmentReport,
}

pub async fn create_ticket(
    ctx: &AppContext,
    request: CreateTicketRequest,
) -> AppResult<TicketWorkflowOutcome> {
    let attachments = resolve_attachments(request.attachment.as_ref())?;
    let mut payload = TicketPayload::from_fields(&request.fields)?;

    let board_id = require_board_id(ctx, &request.board_name).await?;
    payload.id_list = Some(ctx.directory.list_id(&board_id, &request.list_name).await?);
    resolve_board_scoped(
        ctx,
        &board_id,
        &mut payload,
        request.members.as_deref(),
        request.labels.as_deref(),
    )
    .await?;

    let card = ctx.cards.create_card(&payload).await?;
    finish(ctx, TicketOperation::Create, card, attachments).await
}

pub async fn update_ticket(
    ctx: &AppContext,
    request: UpdateTicketRequest,
) -> AppResult<TicketWorkflowOutcome> {
    let attachments = resolve_attachments(request.attachment.as_ref())?;
    let mut payload = TicketPayload::from_fields(&request.fields)?;

    let existing = ctx.cards.fetch_card(&request.card_ref).await?;
    info!(card_id = %existing.id, board_id = %existing.id_board, "card located");

    let board_id = match &request.board_name {
        Some(board_name) => {
            let board_id = require_board_id(ctx, board_name).await?;
            payload.id_board = Some(board_id.clone());
            board_id
        }
        None => existing.id_board.clone(),
    };
    if let Some(list_name) = &request.list_name {
        payload.id_list = Some(ctx.directory.list_id(&board_id, list_name).await?);
    }
    resolve_board_scoped(
        ctx,
        &board_id,
        &mut payload,
        request.members.as_deref(),
        request.labels.as_deref(),
    )
    .await?;
    if let Some(custom) = request.custom_fields {
        payload.merge_custom(custom)?;
    }

    let card = ctx.cards.update_card(&existing.id, &payload).await?;
    finish(ctx, TicketOperation::Update, card, attachments).await
}

async fn require_board_id(ctx: &AppContext, board_name: &str) -> AppResult<String> {
    ctx.directory
        .board_id(board_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no board with name {board_name} found")))
}

async fn resolve_board_scoped(
    ctx: &AppContext,
    board_id: &str,
    payload: &mut TicketPayload,
    members: Option<&[String]>,
    labels: Option<&[String]>,
) -> AppResult<()> {
    if let Some(members) = members {
        payload.id_members = Some(ctx.directory.member_ids(board_id, members).await?);
    }
    if let Some(labels) = labels {
        payload.id_labels = Some(ctx.directory.label_ids(board_id, labels).await?);
    }
    Ok(())
}

/// Local files to upload. Runs before any card is created or changed.
fn resolve_attachments(source: Option<&AttachmentSource>) -> AppResult<Vec<PathBuf>> {
    let Some(source) = source else {
        return Ok(Vec::new());
    };
    let paths = source.resolve()?;
    if paths.is_empty() {
        warn!(pattern = %source.file_name, "no files matched for attachment");
    }
    Ok(paths)
}

async fn finish(
    ctx: &AppContext,
    operation: TicketOperation,
    card: CardResponse,
    attachment_paths: Vec<PathBuf>,
) -> AppResult<TicketWorkflowOutcome> {
    let attachments = attach_files(ctx, card.id(), attachment_paths).await?;

    let response_path = ctx
        .artifacts
        .write_response(&operation.artifact_name(card.id()), &card)?;

    Ok(TicketWorkflowOutcome {
        operation,
        card,
        response_path,
        attachments,
    })
}

/// Uploads every resolved file in turn. Only an authorization failure stops
/// the loop; other failures are collected in the report.
async fn attach_files(
    ctx: &AppContext,
    card_id: &str,
    paths: Vec<PathBuf>,
) -> AppResult<AttachmentReport> {
    let mut report = AttachmentReport::default();
    for path in paths {
        match ctx.cards.attach_file(card_id, &path).await {
            Ok(()) => report.attached.push(path),
            Err(AppError::Authorization) => return Err(AppError::Authorization),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "attachment failed");
                report.failed.push((path, err.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::domain::attachment::MatchType;
    use crate::domain::ticket::CardSummary;
    use crate::infra::artifacts::ArtifactStore;
    use crate::services::{BoardDirectory, CardService};

    #[derive(Default)]
    struct FakeTrello {
        unauthorized: bool,
        calls: Mutex<Vec<String>>,
        created: Mutex<Vec<TicketPayload>>,
        updated: Mutex<Vec<(String, TicketPayload)>>,
    }

    impl FakeTrello {
        fn record(&self, call: &str) -> AppResult<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.unauthorized {
                Err(AppError::Authorization)
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BoardDirectory for FakeTrello {
        async fn board_id(&self, board_name: &str) -> AppResult<Option<String>> {
            self.record("board_id")?;
            Ok(match board_name {
                "Pipeline" => Some("b1".to_string()),
                "Archive" => Some("b2".to_string()),
                _ => None,
            })
        }

        async fn list_id(&self, board_id: &str, list_name: &str) -> AppResult<String> {
            self.record(&format!("list_id:{board_id}"))?;
            match (board_id, list_name) {
                ("b1", "To Do") => Ok("l1".to_string()),
                ("b2", "Done") => Ok("l2".to_string()),
                _ => Err(AppError::NotFound(list_name.to_string())),
            }
        }

        async fn label_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>> {
            self.record(&format!("label_ids:{board_id}"))?;
            Ok(names.iter().map(|name| format!("label-{name}")).collect())
        }

        async fn member_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>> {
            self.record(&format!("member_ids:{board_id}"))?;
            Ok(names.iter().map(|name| format!("member-{name}")).collect())
        }
    }

    #[async_trait]
    impl CardService for FakeTrello {
        async fn fetch_card(&self, card_ref: &str) -> AppResult<CardSummary> {
            self.record("fetch_card")?;
            Ok(CardSummary {
                id: format!("id-of-{card_ref}"),
                id_board: "b1".to_string(),
            })
        }

        async fn create_card(&self, payload: &TicketPayload) -> AppResult<CardResponse> {
            self.record("create_card")?;
            let mut created = self.created.lock().unwrap();
            created.push(payload.clone());
            CardResponse::from_value(json!({"id": format!("card-{}", created.len())}))
        }

        async fn update_card(
            &self,
            card_id: &str,
            payload: &TicketPayload,
        ) -> AppResult<CardResponse> {
            self.record("update_card")?;
            self.updated
                .lock()
                .unwrap()
                .push((card_id.to_string(), payload.clone()));
            CardResponse::from_value(json!({"id": card_id, "closed": false}))
        }

        async fn attach_file(&self, _card_id: &str, path: &Path) -> AppResult<()> {
            self.record("attach_file")?;
            if path.to_string_lossy().contains("forbidden") {
                return Err(AppError::Authorization);
            }
            if path.to_string_lossy().contains("broken") {
                return Err(AppError::Unknown {
                    status: 413,
                    body: "too large".to_string(),
                });
            }
            Ok(())
        }
    }

    fn context(fake: &Arc<FakeTrello>, root: &Path) -> AppContext {
        AppContext::new(
            fake.clone(),
            fake.clone(),
            ArtifactStore::init(root).unwrap(),
        )
    }

    fn create_request() -> CreateTicketRequest {
        CreateTicketRequest {
            board_name: "Pipeline".to_string(),
            list_name: "To Do".to_string(),
            fields: TicketFields {
                name: Some("Load failed".to_string()),
                description: Some("Nightly run".to_string()),
                ..TicketFields::default()
            },
            ..CreateTicketRequest::default()
        }
    }

    #[tokio::test]
    async fn create_sends_list_name_and_description_only() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let outcome = create_ticket(&ctx, create_request()).await.unwrap();

        assert_eq!(fake.calls(), vec!["board_id", "list_id:b1", "create_card"]);
        let created = fake.created.lock().unwrap();
        assert_eq!(
            serde_json::to_value(&created[0]).unwrap(),
            json!({"idList": "l1", "name": "Load failed", "desc": "Nightly run"})
        );
        assert_eq!(outcome.card.id(), "card-1");
        assert_eq!(
            outcome.response_path,
            ctx.artifacts
                .responses_dir()
                .join("create_ticket_card-1_response.json")
        );
        assert!(outcome.response_path.is_file());
    }

    #[tokio::test]
    async fn create_includes_resolved_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let mut request = create_request();
        request.fields.due_date = Some("03/15/2024".to_string());
        request.fields.url_source = Some("https://example.com/run/1".to_string());
        request.labels = Some(vec!["bug".to_string()]);
        request.members = Some(vec!["ada".to_string()]);

        create_ticket(&ctx, request).await.unwrap();

        let created = fake.created.lock().unwrap();
        assert_eq!(
            serde_json::to_value(&created[0]).unwrap(),
            json!({
                "idList": "l1",
                "name": "Load failed",
                "desc": "Nightly run",
                "due": "2024-03-15T00:00:00Z",
                "idMembers": ["member-ada"],
                "idLabels": ["label-bug"],
                "urlSource": "https://example.com/run/1"
            })
        );
    }

    #[tokio::test]
    async fn unauthorized_resolution_stops_before_any_other_call() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello {
            unauthorized: true,
            ..FakeTrello::default()
        });
        let ctx = context(&fake, dir.path());

        let err = create_ticket(&ctx, create_request()).await.unwrap_err();

        assert!(matches!(err, AppError::Authorization));
        assert_eq!(fake.calls(), vec!["board_id"]);
        assert_eq!(
            std::fs::read_dir(ctx.artifacts.responses_dir())
                .unwrap()
                .count(),
            0
        );
    }

    #[tokio::test]
    async fn unknown_board_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let mut request = create_request();
        request.board_name = "Nope".to_string();
        let err = create_ticket(&ctx, request).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fake.calls(), vec!["board_id"]);
    }

    #[tokio::test]
    async fn repeated_create_makes_a_new_card_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let first = create_ticket(&ctx, create_request()).await.unwrap();
        let second = create_ticket(&ctx, create_request()).await.unwrap();

        assert_ne!(first.card.id(), second.card.id());
        assert_eq!(fake.created.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_moves_card_and_resolves_list_on_target_board() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let Value::Object(custom) = json!({"pos": "top"}) else {
            unreachable!()
        };
        let request = UpdateTicketRequest {
            card_ref: "AbC123".to_string(),
            board_name: Some("Archive".to_string()),
            list_name: Some("Done".to_string()),
            labels: Some(vec!["done".to_string()]),
            custom_fields: Some(custom),
            fields: TicketFields {
                due_complete: Some(true),
                ..TicketFields::default()
            },
            ..UpdateTicketRequest::default()
        };

        let outcome = update_ticket(&ctx, request).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                "fetch_card",
                "board_id",
                "list_id:b2",
                "label_ids:b2",
                "update_card"
            ]
        );
        let updated = fake.updated.lock().unwrap();
        assert_eq!(updated[0].0, "id-of-AbC123");
        assert_eq!(
            serde_json::to_value(&updated[0].1).unwrap(),
            json!({
                "idList": "l2",
                "idBoard": "b2",
                "dueComplete": true,
                "idLabels": ["label-done"],
                "pos": "top"
            })
        );
        assert_eq!(
            outcome.response_path.file_name().unwrap(),
            "update_ticket_id-of-AbC123_response.json"
        );
    }

    #[tokio::test]
    async fn update_list_without_board_uses_cards_board() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let request = UpdateTicketRequest {
            card_ref: "AbC123".to_string(),
            list_name: Some("To Do".to_string()),
            ..UpdateTicketRequest::default()
        };
        update_ticket(&ctx, request).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec!["fetch_card", "list_id:b1", "update_card"]
        );
        let updated = fake.updated.lock().unwrap();
        assert_eq!(
            serde_json::to_value(&updated[0].1).unwrap(),
            json!({"idList": "l1"})
        );
    }

    #[tokio::test]
    async fn failed_attachment_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("exports");
        std::fs::create_dir(&source_dir).unwrap();
        std::fs::write(source_dir.join("broken.csv"), "x").unwrap();
        std::fs::write(source_dir.join("good.csv"), "y").unwrap();
        std::fs::write(source_dir.join("notes.txt"), "z").unwrap();

        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, &dir.path().join("out"));

        let mut request = create_request();
        request.attachment = Some(AttachmentSource {
            file_name: r"\.csv$".to_string(),
            folder: source_dir.to_string_lossy().into_owned(),
            match_type: MatchType::Regex,
        });
        let outcome = create_ticket(&ctx, request).await.unwrap();

        assert_eq!(outcome.attachments.attached, vec![source_dir.join("good.csv")]);
        assert_eq!(outcome.attachments.failed.len(), 1);
        assert_eq!(outcome.attachments.failed[0].0, source_dir.join("broken.csv"));
        assert!(outcome.response_path.is_file());
    }

    #[test]
    fn names_artifacts_by_operation() {
        assert_eq!(
            TicketOperation::Create.artifact_name("c1"),
            "create_ticket_c1_response.json"
        );
        assert_eq!(
            TicketOperation::Update.artifact_name("c1"),
            "update_ticket_c1_response.json"
        );
    }

    fn regex_attachment(folder: &Path, pattern: &str) -> AttachmentSource {
        AttachmentSource {
            file_name: pattern.to_string(),
            folder: folder.to_string_lossy().into_owned(),
            match_type: MatchType::Regex,
        }
    }

    #[tokio::test]
    async fn invalid_attachment_pattern_is_rejected_before_creating_the_card() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let mut request = create_request();
        request.attachment = Some(regex_attachment(dir.path(), "("));
        let err = create_ticket(&ctx, request).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(fake.calls().is_empty());
        assert!(fake.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_attachment_folder_is_rejected_before_updating_the_card() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, dir.path());

        let request = UpdateTicketRequest {
            card_ref: "AbC123".to_string(),
            attachment: Some(regex_attachment(&dir.path().join("absent"), r"\.csv$")),
            ..UpdateTicketRequest::default()
        };
        let err = update_ticket(&ctx, request).await.unwrap_err();

        assert!(matches!(err, AppError::Io(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_attachment_stops_remaining_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("exports");
        std::fs::create_dir(&source_dir).unwrap();
        std::fs::write(source_dir.join("a_forbidden.csv"), "x").unwrap();
        std::fs::write(source_dir.join("b_good.csv"), "y").unwrap();

        let fake = Arc::new(FakeTrello::default());
        let ctx = context(&fake, &dir.path().join("out"));

        let mut request = create_request();
        request.attachment = Some(regex_attachment(&source_dir, r"\.csv$"));
        let err = create_ticket(&ctx, request).await.unwrap_err();

        assert!(matches!(err, AppError::Authorization));
        assert_eq!(
            fake.calls(),
            vec!["board_id", "list_id:b1", "create_card", "attach_file"]
        );
        assert_eq!(
            std::fs::read_dir(ctx.artifacts.responses_dir())
                .unwrap()
                .count(),
            0
        );
    }
}
