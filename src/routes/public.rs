use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::public::{AcceptQuoteRequest, ClientQuoteView, RefuseQuoteRequest},
    error::AppResult,
    response::ApiResponse,
    services::public_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes/{token}", get(view_quote))
        .route("/quotes/{token}/accept", post(accept_quote))
        .route("/quotes/{token}/refuse", post(refuse_quote))
}

#[utoipa::path(
    get,
    path = "/api/public/quotes/{token}",
    params(("token" = String, Path, description = "Consultation token")),
    responses(
        (status = 200, description = "Quote as shown to the client; first view marks it consulted", body = ApiResponse<ClientQuoteView>),
        (status = 404, description = "Unknown token"),
    ),
    tag = "Client"
)]
pub async fn view_quote(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<ApiResponse<ClientQuoteView>>> {
    let resp = public_service::view_quote(&state, &token).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/public/quotes/{token}/accept",
    params(("token" = String, Path, description = "Consultation token")),
    request_body = AcceptQuoteRequest,
    responses(
        (status = 200, description = "Quote accepted", body = ApiResponse<ClientQuoteView>),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Quote expired or already answered"),
        (status = 422, description = "Missing signatory"),
    ),
    tag = "Client"
)]
pub async fn accept_quote(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<AcceptQuoteRequest>,
) -> AppResult<Json<ApiResponse<ClientQuoteView>>> {
    let resp = public_service::accept_quote(&state, &token, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/public/quotes/{token}/refuse",
    params(("token" = String, Path, description = "Consultation token")),
    request_body = RefuseQuoteRequest,
    responses(
        (status = 200, description = "Quote refused", body = ApiResponse<ClientQuoteView>),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Quote expired or already answered"),
    ),
    tag = "Client"
)]
pub async fn refuse_quote(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<RefuseQuoteRequest>,
) -> AppResult<Json<ApiResponse<ClientQuoteView>>> {
    let resp = public_service::refuse_quote(&state, &token, payload).await?;
    Ok(Json(resp))
}
