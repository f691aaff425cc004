use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

const INPUT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Converts a `MM/DD/YYYY` date into the ISO-8601 form Trello expects.
///
/// The trailing `Z` is appended literally: the date is not shifted from any
/// local timezone, midnight of the given day is simply labelled UTC.
pub fn convert_date(input: &str) -> AppResult<String> {
    let date = NaiveDate::parse_from_str(input.trim(), INPUT_DATE_FORMAT).map_err(|err| {
        AppError::InvalidInput(format!("date '{input}' is not in MM/DD/YYYY format: {err}"))
    })?;
    Ok(format!(
        "{}Z",
        date.and_time(NaiveTime::MIN).format("%Y-%m-%dT%H:%M:%S")
    ))
}

/// Request body for the create and update card endpoints.
///
/// Only fields that were explicitly supplied are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

/// Card fields a user may supply on either subcommand.
#[derive(Debug, Clone, Default)]
pub struct TicketFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub due_complete: Option<bool>,
    pub url_source: Option<String>,
    pub address: Option<String>,
    pub location_name: Option<String>,
    pub coordinates: Option<String>,
}

impl TicketPayload {
    /// Builds the pass-through part of the payload. Dates are converted, the
    /// rest is copied under its Trello field name. Blank values count as absent.
    pub fn from_fields(fields: &TicketFields) -> AppResult<Self> {
        Ok(Self {
            name: supplied(&fields.name),
            desc: supplied(&fields.description),
            start: supplied(&fields.start_date)
                .as_deref()
                .map(convert_date)
                .transpose()?,
            due: supplied(&fields.due_date)
                .as_deref()
                .map(convert_date)
                .transpose()?,
            due_complete: fields.due_complete,
            url_source: supplied(&fields.url_source),
            address: supplied(&fields.address),
            location_name: supplied(&fields.location_name),
            coordinates: supplied(&fields.coordinates),
            ..Self::default()
        })
    }

    /// Merges arbitrary user-provided fields. Keys already set through a
    /// named field are kept as they are.
    pub fn merge_custom(&mut self, custom: Map<String, Value>) -> AppResult<()> {
        let explicit = match serde_json::to_value(Self {
            custom: Map::new(),
            ..self.clone()
        })? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in custom {
            if !explicit.contains_key(&key) {
                self.custom.insert(key, value);
            }
        }
        Ok(())
    }
}

fn supplied(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Raw card JSON returned by Trello, kept verbatim for the response artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CardResponse {
    id: String,
    body: Value,
}

impl CardResponse {
    pub fn from_value(body: Value) -> AppResult<Self> {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::UnexpectedResponse("card response has no 'id' field".to_string())
            })?;
        Ok(Self { id, body })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// The identifiers of an existing card needed to update it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub id: String,
    pub id_board: String,
}
