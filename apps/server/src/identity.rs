use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};

/// Request header carrying the caller's identity, set by the upstream identity provider
pub const OWNER_HEADER: &str = "X-Owner-Id";

/// Caller identity taken from [`OWNER_HEADER`].
///
/// A missing or unreadable header yields an empty identity, which the
/// registry rejects as unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity(pub String);

impl OwnerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for OwnerIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let owner = req
            .headers()
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .unwrap_or_default();

        ready(Ok(OwnerIdentity(owner)))
    }
}
