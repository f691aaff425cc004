use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::ACCEPT,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::domain::board::{self, Membership, NamedResource};
use crate::domain::ticket::{CardResponse, CardSummary, TicketPayload};
use crate::error::{AppError, AppResult};
use crate::services::{BoardDirectory, CardService};

pub struct TrelloClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl TrelloClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Every Trello call authenticates through `key` and `token` query parameters.
    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header(ACCEPT, "application/json")
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("token", self.credentials.access_token.as_str()),
            ])
    }

    async fn send(request: RequestBuilder) -> AppResult<Response> {
        request
            .send()
            .await
            .map_err(|err| AppError::Transport(err.to_string()))
    }

    async fn body_text(response: Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string())
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, &str)],
    ) -> AppResult<Vec<T>> {
        debug!(path, "listing Trello collection");
        let response =
            Self::send(self.request(reqwest::Method::GET, path).query(extra_query)).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Authorization);
        }
        if !status.is_success() {
            return Err(AppError::Unknown {
                status: status.as_u16(),
                body: Self::body_text(response).await,
            });
        }

        response.json().await.map_err(|err| {
            AppError::UnexpectedResponse(format!("failed to parse {path} response: {err}"))
        })
    }

    async fn read_card(response: Response) -> AppResult<CardResponse> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Authorization);
        }
        if status == StatusCode::BAD_REQUEST {
            return Err(AppError::BadRequest(Self::body_text(response).await));
        }
        if !status.is_success() {
            return Err(AppError::Unknown {
                status: status.as_u16(),
                body: Self::body_text(response).await,
            });
        }

        let body = response.json().await.map_err(|err| {
            AppError::UnexpectedResponse(format!("failed to parse card response: {err}"))
        })?;
        CardResponse::from_value(body)
    }
}

#[async_trait]
impl BoardDirectory for TrelloClient {
    async fn board_id(&self, board_name: &str) -> AppResult<Option<String>> {
        let boards: Vec<NamedResource> = self
            .get_collection("members/me/boards", &[("lists", "all")])
            .await?;
        Ok(board::first_id_named(&boards, board_name))
    }

    async fn list_id(&self, board_id: &str, list_name: &str) -> AppResult<String> {
        let lists: Vec<NamedResource> = self
            .get_collection(&format!("boards/{board_id}/lists"), &[])
            .await?;
        board::first_id_named(&lists, list_name)
            .ok_or_else(|| AppError::NotFound(format!("no list with name {list_name} found")))
    }

    async fn label_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let labels: Vec<NamedResource> = self
            .get_collection(&format!("boards/{board_id}/labels"), &[])
            .await?;
        Ok(board::ids_named(&labels, names))
    }

    async fn member_ids(&self, board_id: &str, names: &[String]) -> AppResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let memberships: Vec<Membership> = self
            .get_collection(&format!("boards/{board_id}/memberships"), &[("member", "true")])
            .await?;
        Ok(board::member_ids_named(&memberships, names))
    }
}

#[async_trait]
impl CardService for TrelloClient {
    async fn fetch_card(&self, card_ref: &str) -> AppResult<CardSummary> {
        let response =
            Self::send(self.request(reqwest::Method::GET, &format!("cards/{card_ref}"))).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Authorization);
        }
        if !status.is_success() {
            return Err(AppError::NotFound(format!(
                "card {card_ref} not found in Trello ({status})"
            )));
        }

        response.json().await.map_err(|err| {
            AppError::UnexpectedResponse(format!("failed to parse card {card_ref}: {err}"))
        })
    }

    async fn create_card(&self, payload: &TicketPayload) -> AppResult<CardResponse> {
        let response =
            Self::send(self.request(reqwest::Method::POST, "cards").json(payload)).await?;
        let card = Self::read_card(response).await?;
        info!(card_id = card.id(), "card created");
        Ok(card)
    }

    async fn update_card(
        &self,
        card_id: &str,
        payload: &TicketPayload,
    ) -> AppResult<CardResponse> {
        let response = Self::send(
            self.request(reqwest::Method::PUT, &format!("cards/{card_id}"))
                .json(payload),
        )
        .await?;
        let card = Self::read_card(response).await?;
        info!(card_id, "card updated");
        Ok(card)
    }

    async fn attach_file(&self, card_id: &str, path: &Path) -> AppResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let response = Self::send(
            self.request(reqwest::Method::POST, &format!("cards/{card_id}/attachments"))
                .multipart(form),
        )
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Authorization);
        }
        if !status.is_success() {
            return Err(AppError::Unknown {
                status: status.as_u16(),
                body: Self::body_text(response).await,
            });
        }
        info!(card_id, file = %path.display(), "file attached");
        Ok(())
    }
}
