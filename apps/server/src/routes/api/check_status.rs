use actix_web::{HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitepulse_service::{CheckOutcome, SiteRegistry, SiteStatus, ValidationError};

use crate::error::ApiError;

macros_utils::routes! {
    route check_status,
}

/// Message reported to clients when no response came back
const UNREACHABLE_MESSAGE: &str = "Could not reach the website";

#[derive(Debug, Deserialize)]
pub struct CheckStatusRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    status: SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    response_time: u64,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<CheckOutcome> for ProbeReport {
    fn from(outcome: CheckOutcome) -> Self {
        Self {
            status: outcome.status,
            status_code: outcome.http_status_code,
            response_time: outcome.response_time_ms,
            timestamp: outcome.checked_at,
            error: outcome.error.map(|_| UNREACHABLE_MESSAGE.to_string()),
        }
    }
}

/// One-off reachability check of an arbitrary URL. Nothing is stored.
///
/// An unreachable site is an expected answer, reported with status 200.
#[post("/check-status")]
pub async fn check_status(
    registry: web::Data<SiteRegistry>,
    body: web::Json<CheckStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let url = body.into_inner().url.unwrap_or_default();
    if url.trim().is_empty() {
        return Err(ValidationError::EmptyUrl.into());
    }

    let outcome = registry.probe_url(&url).await?;
    Ok(HttpResponse::Ok().json(ProbeReport::from(outcome)))
}
