use chrono::{DateTime, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_quote,
    dto::quotes::{
        DeletedQuote, QuoteActionRequest, QuoteDetail, QuoteDraftRequest, QuoteList, ReminderList,
        SweepResult,
    },
    entity::quotes::{ActiveModel as QuoteActive, Column as QuoteCol, Entity as Quotes, Model as QuoteModel},
    error::{AppError, AppResult},
    lifecycle::{self, Outcome, TransitionContext},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Quote, QuoteStatus, Settings},
    pricing::compute_amounts,
    reminders,
    response::{ApiResponse, Meta},
    routes::params::{QuoteListQuery, SortOrder},
    services::{numbering, settings_service::load_settings},
    state::AppState,
    stats,
};

const OPEN_STATUSES: [QuoteStatus; 2] = [QuoteStatus::Validated, QuoteStatus::Viewed];

pub fn decode(model: &QuoteModel) -> AppResult<Quote> {
    Ok(serde_json::from_value(model.document.clone())?)
}

pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub async fn insert_quote<C: ConnectionTrait>(
    conn: &C,
    quote: &Quote,
    now: DateTime<Utc>,
) -> AppResult<QuoteModel> {
    let model = QuoteActive {
        id: Set(quote.id.clone()),
        token: Set(quote.token.clone()),
        statut: Set(quote.statut.as_str().to_string()),
        statut_paiement: Set(quote.statut_paiement.as_str().to_string()),
        client_email: Set(quote.client.email.clone()),
        date_creation: Set(quote.date_creation.into()),
        version: Set(1),
        document: Set(serde_json::to_value(quote)?),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

/// Writes the whole document back and bumps the row version.
pub async fn save_quote<C: ConnectionTrait>(
    conn: &C,
    model: QuoteModel,
    quote: &Quote,
    now: DateTime<Utc>,
) -> AppResult<QuoteModel> {
    let version = model.version + 1;
    let mut active: QuoteActive = model.into();
    active.statut = Set(quote.statut.as_str().to_string());
    active.statut_paiement = Set(quote.statut_paiement.as_str().to_string());
    active.client_email = Set(quote.client.email.clone());
    active.version = Set(version);
    active.document = Set(serde_json::to_value(quote)?);
    active.updated_at = Set(now.into());
    Ok(active.update(conn).await?)
}

pub async fn lock_quote<C: ConnectionTrait>(
    conn: &C,
    id: &str,
) -> AppResult<(QuoteModel, Quote)> {
    let model = Quotes::find_by_id(id.to_string())
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let quote = decode(&model)?;
    Ok((model, quote))
}

pub async fn lock_open_quotes<C: ConnectionTrait>(
    conn: &C,
) -> AppResult<Vec<(QuoteModel, Quote)>> {
    let models = Quotes::find()
        .filter(QuoteCol::Statut.is_in(OPEN_STATUSES.map(|s| s.as_str())))
        .order_by_asc(QuoteCol::DateCreation)
        .lock(LockType::Update)
        .all(conn)
        .await?;
    models
        .into_iter()
        .map(|model| decode(&model).map(|quote| (model, quote)))
        .collect()
}

/// Expires every open quote past its validity window; returns the ids moved.
pub async fn expire_open_quotes<C: ConnectionTrait>(
    conn: &C,
    settings: &Settings,
    now: DateTime<Utc>,
) -> AppResult<Vec<String>> {
    let mut expired = Vec::new();
    for (model, mut quote) in lock_open_quotes(conn).await? {
        if lifecycle::expire_if_due(&mut quote, now, settings.validity_days) {
            save_quote(conn, model, &quote, now).await?;
            expired.push(quote.id);
        }
    }
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), ids = ?expired, "quotes expired");
    }
    Ok(expired)
}

fn detail(state: &AppState, model: &QuoteModel, quote: Quote) -> QuoteDetail {
    QuoteDetail {
        lien_consultation: state.config.consultation_link(&quote.token),
        version: model.version,
        quote,
    }
}

fn ensure_version(model: &QuoteModel, expected: Option<i32>) -> AppResult<()> {
    match expected {
        Some(version) if version != model.version => Err(AppError::Conflict(format!(
            "quote {} is at version {}, request was built on version {}",
            model.id, model.version, version
        ))),
        _ => Ok(()),
    }
}

#[tracing::instrument(skip(state, user, query))]
pub async fn list_quotes(
    state: &AppState,
    user: &AuthUser,
    query: QuoteListQuery,
) -> AppResult<ApiResponse<QuoteList>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let (page, limit, offset) = query.pagination().normalize();

    // Expiry is evaluated lazily on every read of the collection.
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    expire_open_quotes(&txn, &settings, now).await?;
    txn.commit().await?;

    let mut finder = Quotes::find();
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(QuoteCol::DateCreation),
        SortOrder::Desc => finder.order_by_desc(QuoteCol::DateCreation),
    };
    let all = finder
        .all(&state.orm)
        .await?
        .iter()
        .map(decode)
        .collect::<AppResult<Vec<Quote>>>()?;

    let stats = stats::compute(&all, now);

    let filtered: Vec<Quote> = all
        .into_iter()
        .filter(|q| query.status.is_none_or(|s| q.statut == s))
        .collect();
    let total = filtered.len() as i64;
    let items = filtered
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    Ok(ApiResponse::success(
        "Quotes",
        QuoteList { items, stats },
        Some(Meta::new(page, limit, total)),
    ))
}

#[tracing::instrument(skip(state, user))]
pub async fn get_quote(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<QuoteDetail>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let (mut model, mut quote) = lock_quote(&txn, id).await?;
    if lifecycle::expire_if_due(&mut quote, now, settings.validity_days) {
        model = save_quote(&txn, model, &quote, now).await?;
    }
    txn.commit().await?;

    let version = model.version;
    Ok(ApiResponse::success(
        "Quote found",
        detail(state, &model, quote),
        Some(Meta::versioned(version)),
    ))
}

#[tracing::instrument(skip(state, user, payload))]
pub async fn create_quote(
    state: &AppState,
    user: &AuthUser,
    payload: QuoteDraftRequest,
) -> AppResult<ApiResponse<QuoteDetail>> {
    ensure_admin(user)?;
    lifecycle::validate_client(&payload.client)?;
    lifecycle::validate_amount_input(
        payload.ht,
        payload.remise_affilie.as_ref().map(|d| d.pourcentage),
    )?;

    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let id = numbering::next_quote_id(&txn).await?;
    let montants = compute_amounts(payload.ht, payload.remise_affilie, &settings);
    let quote = lifecycle::new_quote(id, new_token(), payload.client, payload.projet, montants, now);
    let model = insert_quote(&txn, &quote, now).await?;
    txn.commit().await?;

    tracing::info!(quote_id = %quote.id, ttc = quote.montants.ttc, "quote created");
    audit_quote(
        &state.pool,
        Some(user.user_id),
        "quote_create",
        &quote.id,
        serde_json::json!({ "ttc": quote.montants.ttc }),
    )
    .await;

    let version = model.version;
    Ok(ApiResponse::success(
        "Quote created",
        detail(state, &model, quote),
        Some(Meta::versioned(version)),
    ))
}

#[tracing::instrument(skip(state, user, payload))]
pub async fn update_draft(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: QuoteDraftRequest,
) -> AppResult<ApiResponse<QuoteDetail>> {
    ensure_admin(user)?;
    lifecycle::validate_amount_input(
        payload.ht,
        payload.remise_affilie.as_ref().map(|d| d.pourcentage),
    )?;

    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let (model, mut quote) = lock_quote(&txn, id).await?;
    let montants = compute_amounts(payload.ht, payload.remise_affilie, &settings);
    lifecycle::edit_draft(&mut quote, payload.client, payload.projet, montants, now)?;
    let model = save_quote(&txn, model, &quote, now).await?;
    txn.commit().await?;

    audit_quote(
        &state.pool,
        Some(user.user_id),
        "quote_update",
        &quote.id,
        serde_json::json!({ "ttc": quote.montants.ttc }),
    )
    .await;

    let version = model.version;
    Ok(ApiResponse::success(
        "Quote updated",
        detail(state, &model, quote),
        Some(Meta::versioned(version)),
    ))
}

/// Applies one typed command inside a transaction holding the row lock.
#[tracing::instrument(skip(state, user, request), fields(action = request.command.action_name()))]
pub async fn apply_action(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    request: QuoteActionRequest,
) -> AppResult<ApiResponse<QuoteDetail>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let QuoteActionRequest { command, version } = request;

    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let (model, mut quote) = lock_quote(&txn, id).await?;
    ensure_version(&model, version)?;

    let mut ctx = TransitionContext::new(now, &settings);
    lifecycle::check(&quote, &command, &ctx)?;
    if let Some(kind) = command.document_kind() {
        let number = numbering::next_document_number(&txn, kind, now).await?;
        ctx = ctx.with_document_number(number);
    }

    let outcome = lifecycle::apply(&mut quote, &command, &ctx)?;
    let model = match outcome {
        Outcome::Applied => save_quote(&txn, model, &quote, now).await?,
        Outcome::Unchanged => model,
    };
    txn.commit().await?;

    if outcome == Outcome::Applied {
        tracing::info!(quote_id = %quote.id, statut = %quote.statut, "quote action applied");
        audit_quote(
            &state.pool,
            Some(user.user_id),
            command.action_name(),
            &quote.id,
            serde_json::json!({
                "statut": quote.statut,
                "statut_paiement": quote.statut_paiement,
                "document_number": ctx.document_number,
            }),
        )
        .await;
    }

    let message = match outcome {
        Outcome::Applied => "Action applied",
        Outcome::Unchanged => "Nothing to do",
    };
    let version = model.version;
    Ok(ApiResponse::success(
        message,
        detail(state, &model, quote),
        Some(Meta::versioned(version)),
    ))
}

#[tracing::instrument(skip(state, user))]
pub async fn duplicate_quote(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<QuoteDetail>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let origin = Quotes::find_by_id(id.to_string())
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let origin = decode(&origin)?;

    let new_id = numbering::next_quote_id(&txn).await?;
    let copy = lifecycle::duplicate(&origin, new_id, new_token(), now);
    let model = insert_quote(&txn, &copy, now).await?;
    txn.commit().await?;

    audit_quote(
        &state.pool,
        Some(user.user_id),
        "quote_duplicate",
        &copy.id,
        serde_json::json!({ "origin": origin.id }),
    )
    .await;

    let version = model.version;
    Ok(ApiResponse::success(
        "Quote duplicated",
        detail(state, &model, copy),
        Some(Meta::versioned(version)),
    ))
}

#[tracing::instrument(skip(state, user))]
pub async fn delete_quote(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<DeletedQuote>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let (model, quote) = lock_quote(&txn, id).await?;
    if !quote.statut.is_deletable() {
        return Err(AppError::InvalidTransition(format!(
            "quote {} is {} and cannot be deleted; only refused or expired quotes can",
            quote.id, quote.statut
        )));
    }
    model.delete(&txn).await?;
    txn.commit().await?;

    audit_quote(
        &state.pool,
        Some(user.user_id),
        "quote_delete",
        &quote.id,
        serde_json::json!({ "statut": quote.statut, "ttc": quote.montants.ttc }),
    )
    .await;

    Ok(ApiResponse::success(
        "Quote deleted",
        DeletedQuote { id: quote.id },
        Some(Meta::empty()),
    ))
}

pub async fn sweep(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SweepResult>> {
    sweep_at(state, user, Utc::now()).await
}

/// Explicit expiration sweep evaluated against `now`.
#[tracing::instrument(skip(state, user))]
pub async fn sweep_at(
    state: &AppState,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<SweepResult>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let expired = expire_open_quotes(&txn, &settings, now).await?;
    txn.commit().await?;

    for id in &expired {
        audit_quote(
            &state.pool,
            Some(user.user_id),
            "expiration",
            id,
            serde_json::json!({ "swept_at": now }),
        )
        .await;
    }

    let total = expired.len() as i64;
    Ok(ApiResponse::success(
        "Sweep done",
        SweepResult { expired },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn due_reminders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReminderList>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let settings = load_settings(&state.orm).await?;
    let open = Quotes::find()
        .filter(QuoteCol::Statut.is_in(OPEN_STATUSES.map(|s| s.as_str())))
        .all(&state.orm)
        .await?
        .iter()
        .map(decode)
        .collect::<AppResult<Vec<Quote>>>()?;

    let items = reminders::due_reminders(&open, &settings, now);
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Due reminders",
        ReminderList { items },
        Some(Meta::new(1, total, total)),
    ))
}
