//! Intake and listing handlers.
//!
//! The intake pipeline is strictly sequential: parse multipart, validate
//! fields, validate files, write files, persist. Validation failures are the
//! caller's fault (400, first error message); anything past validation is a
//! server fault (500, generic message, detail logged).

use std::sync::Arc;

use axum::extract::multipart::Multipart;
use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use chrono::{DateTime, Utc};
use intake_filestore::FilePayload;
use intake_primitives::investor::InvestorId;
use intake_primitives::validation::{
    validate_fields, validate_files, FileDescriptor, RawSubmission,
};
use intake_store::{FileRecord, RecentInvestor};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::service::{ApiError, ApiResponse};
use crate::ServerState;

#[derive(Debug, Serialize)]
pub struct CreateInvestorResponse {
    pub data: InvestorCreated,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorCreated {
    pub id: InvestorId,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub files_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListInvestorsQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListInvestorsResponse {
    pub data: ListInvestorsData,
}

#[derive(Debug, Serialize)]
pub struct ListInvestorsData {
    pub investors: Vec<InvestorSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorSummary {
    pub id: InvestorId,
    pub first_name: String,
    pub last_name: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub files_count: u64,
}

impl From<RecentInvestor> for InvestorSummary {
    fn from(investor: RecentInvestor) -> Self {
        Self {
            id: investor.id,
            first_name: investor.first_name,
            last_name: investor.last_name,
            state: investor.state,
            created_at: investor.created_at,
            files_count: investor.files_count,
        }
    }
}

/// `POST /api/investors` — multipart submission of one investor plus one or
/// more documents.
pub async fn create_investor_handler(
    Extension(state): Extension<Arc<ServerState>>,
    multipart: Multipart,
) -> Response {
    let (raw, uploads) = match read_submission(multipart).await {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    // Field validation computes the full error list; only the first is
    // surfaced (fail-fast at the boundary).
    let submission = match validate_fields(&raw, Utc::now().date_naive()) {
        Ok(submission) => submission,
        Err(errors) => {
            debug!(count = errors.len(), "submission failed field validation");
            return first_error_response(&errors);
        }
    };

    let descriptors: Vec<FileDescriptor> = uploads
        .iter()
        .map(|upload| FileDescriptor {
            name: upload.name.clone(),
            size: upload.bytes.len() as u64,
            mime_type: upload.mime_type.clone(),
        })
        .collect();

    let file_errors = validate_files(&descriptors, state.max_file_size);
    if !file_errors.is_empty() {
        debug!(count = file_errors.len(), "submission failed file validation");
        return first_error_response(&file_errors);
    }

    // Input has passed validation; everything from here on is a server
    // fault, not a client one.
    let stored = match state.files.put_batch(&uploads).await {
        Ok(stored) => stored,
        Err(err) => {
            error!(%err, "failed to store uploaded files");
            return ApiError::internal("Failed to store uploaded files").into_response();
        }
    };

    let records: Vec<FileRecord> = stored
        .into_iter()
        .map(|file| FileRecord {
            stored_path: file.stored_path,
            original_name: file.original_name,
            size: file.size,
            mime_type: file.mime_type,
        })
        .collect();

    let created = {
        let mut store = match state.store.lock() {
            Ok(store) => store,
            Err(_) => {
                error!("store lock poisoned");
                return ApiError::internal("Failed to save submission").into_response();
            }
        };
        store.create_investor(&submission, &records)
    };

    match created {
        Ok(created) => {
            info!(investor_id=%created.id, files=created.files_count, "investor submission accepted");
            ApiResponse::created(CreateInvestorResponse {
                data: InvestorCreated {
                    id: created.id,
                    first_name: created.first_name,
                    last_name: created.last_name,
                    created_at: created.created_at,
                    files_count: created.files_count,
                },
            })
            .into_response()
        }
        Err(err) => {
            // Any files written above are now orphaned; the periodic sweep
            // reclaims them.
            error!(%err, "failed to persist investor submission");
            ApiError::internal("Failed to save submission").into_response()
        }
    }
}

/// `GET /api/investors` — most recent records, newest first, capped at 50.
pub async fn list_investors_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(query): Query<ListInvestorsQuery>,
) -> Response {
    let recent = {
        let store = match state.store.lock() {
            Ok(store) => store,
            Err(_) => {
                error!("store lock poisoned");
                return ApiError::internal("Failed to read submissions").into_response();
            }
        };
        store.recent_investors(query.limit)
    };

    match recent {
        Ok(investors) => ApiResponse::ok(ListInvestorsResponse {
            data: ListInvestorsData {
                investors: investors.into_iter().map(Into::into).collect(),
            },
        })
        .into_response(),
        Err(err) => {
            error!(%err, "failed to list investors");
            ApiError::internal("Failed to read submissions").into_response()
        }
    }
}

/// Drains the multipart stream into the seven scalar fields plus the
/// uploaded file payloads. Unknown fields are ignored.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(RawSubmission, Vec<FilePayload>), ApiError> {
    let mut raw = RawSubmission::default();
    let mut uploads = Vec::new();

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("Malformed multipart request: {err}")))?;
        let Some(field) = field else { break };

        let name = field.name().unwrap_or("").to_owned();

        if name == "files" {
            let original_name = field
                .file_name()
                .map_or_else(|| "upload".to_owned(), ToOwned::to_owned);
            let mime_type = field.content_type().unwrap_or("").to_owned();
            let bytes = field.bytes().await.map_err(|err| {
                ApiError::bad_request(format!("Failed to read uploaded file: {err}"))
            })?;

            uploads.push(FilePayload {
                name: original_name,
                mime_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| ApiError::bad_request(format!("Failed to read field: {err}")))?;

        match name.as_str() {
            "firstName" => raw.first_name = value,
            "lastName" => raw.last_name = value,
            "dateOfBirth" => raw.date_of_birth = value,
            "phoneNumber" => raw.phone_number = value,
            "streetAddress" => raw.street_address = value,
            "state" => raw.state = value,
            "zipCode" => raw.zip_code = value,
            _ => {}
        }
    }

    Ok((raw, uploads))
}

fn first_error_response(errors: &[intake_primitives::validation::FieldError]) -> Response {
    let message = errors
        .first()
        .map_or_else(|| "Invalid submission".to_owned(), |err| err.message.clone());
    ApiError::bad_request(message).into_response()
}
