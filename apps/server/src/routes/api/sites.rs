use actix_web::{HttpResponse, delete, get, post, web};
use serde::Deserialize;
use sitepulse_service::SiteRegistry;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::OwnerIdentity;

macros_utils::routes! {
    route list_sites,
    route create_site,
    route get_site,
    route refresh_site,
    route delete_site,
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    #[serde(default)]
    url: String,
}

/// Sites of the calling owner, oldest first
#[get("/sites")]
pub async fn list_sites(
    registry: web::Data<SiteRegistry>,
    owner: OwnerIdentity,
) -> Result<HttpResponse, ApiError> {
    let sites = registry.list_sites(owner.as_str()).await?;
    Ok(HttpResponse::Ok().json(sites))
}

/// Register a site and run its first check
#[post("/sites")]
pub async fn create_site(
    registry: web::Data<SiteRegistry>,
    owner: OwnerIdentity,
    body: web::Json<CreateSiteRequest>,
) -> Result<HttpResponse, ApiError> {
    let site = registry.register_site(owner.as_str(), &body.url).await?;
    Ok(HttpResponse::Created().json(site))
}

#[get("/sites/{id}")]
pub async fn get_site(
    registry: web::Data<SiteRegistry>,
    owner: OwnerIdentity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let site = registry.get_site(path.into_inner(), owner.as_str()).await?;
    Ok(HttpResponse::Ok().json(site))
}

#[post("/sites/{id}/refresh")]
pub async fn refresh_site(
    registry: web::Data<SiteRegistry>,
    owner: OwnerIdentity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let site = registry.refresh_site(path.into_inner(), owner.as_str()).await?;
    Ok(HttpResponse::Ok().json(site))
}

#[delete("/sites/{id}")]
pub async fn delete_site(
    registry: web::Data<SiteRegistry>,
    owner: OwnerIdentity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    registry.delete_site(path.into_inner(), owner.as_str()).await?;
    Ok(HttpResponse::NoContent().finish())
}
