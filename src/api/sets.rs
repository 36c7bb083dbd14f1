use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::middleware::OptionalViewer;
use crate::models::{SetDetail, SetDraft, SetPage, SetSummary};
use crate::services::auth_service::Claims;
use crate::services::set_service::{self, PublicListParams};
use crate::state::AppState;
use crate::utils::AppError;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SetListResponse {
    pub success: bool,
    pub sets: Vec<SetSummary>,
    /// Matches across all pages
    pub total: u64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SetDetailResponse {
    pub success: bool,
    pub set: SetDetail,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MutationResponse {
    pub success: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl MutationResponse {
    fn success(id: Option<String>) -> Self {
        MutationResponse {
            success: true,
            status: "success".to_string(),
            id,
        }
    }
}

fn list_response(page: SetPage) -> HttpResponse {
    HttpResponse::Ok().json(SetListResponse {
        success: true,
        total: page.total,
        sets: page.sets,
    })
}

/// Browse and search public sets
#[utoipa::path(
    get,
    path = "/api/v1/sets",
    tag = "Sets",
    params(PublicListParams),
    responses(
        (status = 200, description = "Public sets, newest first", body = SetListResponse)
    )
)]
pub async fn list_public_sets(
    state: web::Data<AppState>,
    query: web::Query<PublicListParams>,
) -> Result<HttpResponse, AppError> {
    let page = set_service::list_public(state.sets.as_ref(), &query).await?;
    Ok(list_response(page))
}

/// Fetch one set with its cards
#[utoipa::path(
    get,
    path = "/api/v1/sets/{id}",
    tag = "Sets",
    params(("id" = String, Path, description = "Set id")),
    responses(
        (status = 200, description = "Set with cards and owner", body = SetDetailResponse),
        (status = 404, description = "Set not found or not visible to the caller")
    )
)]
pub async fn get_set(
    state: web::Data<AppState>,
    viewer: OptionalViewer,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let set = set_service::get_by_id(
        state.sets.as_ref(),
        state.users.as_ref(),
        viewer.as_ref(),
        &path.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(SetDetailResponse { success: true, set }))
}

/// Sets owned by the caller
#[utoipa::path(
    get,
    path = "/api/v1/me/sets",
    tag = "My sets",
    responses(
        (status = 200, description = "All sets of the caller", body = SetListResponse),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_sets(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let sets = set_service::list_owned_by(state.sets.as_ref(), &user.viewer()).await?;
    Ok(list_response(SetPage {
        total: sets.len() as u64,
        sets,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/me/sets",
    tag = "My sets",
    request_body = SetDraft,
    responses(
        (status = 201, description = "Set created", body = MutationResponse),
        (status = 400, description = "Invalid set"),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_set(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    body: web::Json<SetDraft>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.viewer();
    let set = set_service::create_set(state.sets.as_ref(), Some(&viewer), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(MutationResponse::success(Some(set.id.to_hex()))))
}

/// Replace a set and all of its cards
#[utoipa::path(
    put,
    path = "/api/v1/me/sets/{id}",
    tag = "My sets",
    params(("id" = String, Path, description = "Set id")),
    request_body = SetDraft,
    responses(
        (status = 200, description = "Set replaced", body = MutationResponse),
        (status = 400, description = "Invalid set"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller does not own the set"),
        (status = 404, description = "Set not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_set(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    body: web::Json<SetDraft>,
) -> Result<HttpResponse, AppError> {
    let set = set_service::update_set(
        state.sets.as_ref(),
        &user.viewer(),
        &path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(MutationResponse::success(Some(set.id.to_hex()))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/me/sets/{id}",
    tag = "My sets",
    params(("id" = String, Path, description = "Set id")),
    responses(
        (status = 200, description = "Set deleted", body = MutationResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller does not own the set"),
        (status = 404, description = "Set not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_set(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    set_service::delete_set(state.sets.as_ref(), &user.viewer(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MutationResponse::success(None)))
}
