use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::quotes::{
        DeletedQuote, QuoteActionRequest, QuoteDetail, QuoteDraftRequest, QuoteList, ReminderList,
        SweepResult,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::QuoteListQuery,
    services::quote_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quotes).post(create_quote))
        .route("/sweep", post(sweep_expired))
        .route("/reminders", get(due_reminders))
        .route(
            "/{id}",
            get(get_quote).put(update_quote).delete(delete_quote),
        )
        .route("/{id}/actions", post(apply_action))
        .route("/{id}/duplicate", post(duplicate_quote))
}

#[utoipa::path(
    get,
    path = "/api/quotes",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by statut (brouillon, valide, consulte, ...)"),
        ("sort_order" = Option<String>, Query, description = "Sort by creation date: asc, desc")
    ),
    responses(
        (status = 200, description = "Quotes with statistics; expired quotes are swept first", body = ApiResponse<QuoteList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn list_quotes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<QuoteListQuery>,
) -> AppResult<Json<ApiResponse<QuoteList>>> {
    let resp = quote_service::list_quotes(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/quotes",
    request_body = QuoteDraftRequest,
    responses(
        (status = 200, description = "Draft created", body = ApiResponse<QuoteDetail>),
        (status = 422, description = "Missing or invalid field"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn create_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<QuoteDraftRequest>,
) -> AppResult<Json<ApiResponse<QuoteDetail>>> {
    let resp = quote_service::create_quote(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    params(("id" = String, Path, description = "Quote number, e.g. D-001")),
    responses(
        (status = 200, description = "Quote detail", body = ApiResponse<QuoteDetail>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<QuoteDetail>>> {
    let resp = quote_service::get_quote(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/quotes/{id}",
    params(("id" = String, Path, description = "Quote number")),
    request_body = QuoteDraftRequest,
    responses(
        (status = 200, description = "Draft updated", body = ApiResponse<QuoteDetail>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Quote is no longer a draft"),
        (status = 422, description = "Missing or invalid field"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn update_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<QuoteDraftRequest>,
) -> AppResult<Json<ApiResponse<QuoteDetail>>> {
    let resp = quote_service::update_draft(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/quotes/{id}",
    params(("id" = String, Path, description = "Quote number")),
    responses(
        (status = 200, description = "Quote deleted", body = ApiResponse<DeletedQuote>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Only refused or expired quotes can be deleted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn delete_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DeletedQuote>>> {
    let resp = quote_service::delete_quote(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/quotes/{id}/actions",
    params(("id" = String, Path, description = "Quote number")),
    request_body = QuoteActionRequest,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<QuoteDetail>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed or stale version"),
        (status = 422, description = "Invalid payload"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn apply_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<QuoteActionRequest>,
) -> AppResult<Json<ApiResponse<QuoteDetail>>> {
    let resp = quote_service::apply_action(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/quotes/{id}/duplicate",
    params(("id" = String, Path, description = "Quote number to copy")),
    responses(
        (status = 200, description = "New draft", body = ApiResponse<QuoteDetail>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn duplicate_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<QuoteDetail>>> {
    let resp = quote_service::duplicate_quote(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/quotes/sweep",
    responses(
        (status = 200, description = "Ids of the quotes moved to expire", body = ApiResponse<SweepResult>),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn sweep_expired(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SweepResult>>> {
    let resp = quote_service::sweep(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/quotes/reminders",
    responses(
        (status = 200, description = "Open quotes due for a reminder", body = ApiResponse<ReminderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Quotes"
)]
pub async fn due_reminders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReminderList>>> {
    let resp = quote_service::due_reminders(&state, &user).await?;
    Ok(Json(resp))
}
