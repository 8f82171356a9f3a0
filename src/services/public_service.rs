//! Client-facing side of a quote, reached through its opaque token.

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, TransactionTrait};

use crate::{
    audit::audit_quote,
    dto::public::{AcceptQuoteRequest, ClientQuoteView, RefuseQuoteRequest},
    entity::quotes::{Column as QuoteCol, Entity as Quotes, Model as QuoteModel},
    error::{AppError, AppResult},
    lifecycle::{self, Outcome, QuoteCommand, TransitionContext},
    models::{Quote, QuoteStatus},
    response::{ApiResponse, Meta},
    services::{
        quote_service::{decode, save_quote},
        settings_service::load_settings,
    },
    state::AppState,
};

/// Drafts are invisible to clients: an unknown token and a draft look the same.
async fn lock_by_token<C: ConnectionTrait>(conn: &C, token: &str) -> AppResult<(QuoteModel, Quote)> {
    let model = Quotes::find()
        .filter(QuoteCol::Token.eq(token))
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let quote = decode(&model)?;
    if quote.statut == QuoteStatus::Draft {
        return Err(AppError::NotFound);
    }
    Ok((model, quote))
}

/// Runs a client command against the quote behind `token`.
///
/// Expiry is checked first and persisted even when it makes the command fail.
async fn respond(
    state: &AppState,
    token: &str,
    command: QuoteCommand,
) -> AppResult<(Quote, Outcome)> {
    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let (mut model, mut quote) = lock_by_token(&txn, token).await?;

    if lifecycle::expire_if_due(&mut quote, now, settings.validity_days) {
        model = save_quote(&txn, model, &quote, now).await?;
        if !matches!(command, QuoteCommand::MarkViewed) {
            txn.commit().await?;
            return Err(AppError::InvalidTransition(format!(
                "quote {} has expired",
                quote.id
            )));
        }
    }

    let ctx = TransitionContext::new(now, &settings);
    let outcome = lifecycle::apply(&mut quote, &command, &ctx)?;
    if outcome == Outcome::Applied {
        save_quote(&txn, model, &quote, now).await?;
    }
    txn.commit().await?;

    if outcome == Outcome::Applied {
        tracing::info!(quote_id = %quote.id, statut = %quote.statut, "client responded");
        audit_quote(
            &state.pool,
            None,
            command.action_name(),
            &quote.id,
            serde_json::json!({ "statut": quote.statut, "via": "client_link" }),
        )
        .await;
    }

    Ok((quote, outcome))
}

#[tracing::instrument(skip_all)]
pub async fn view_quote(state: &AppState, token: &str) -> AppResult<ApiResponse<ClientQuoteView>> {
    let (quote, _) = respond(state, token, QuoteCommand::MarkViewed).await?;
    Ok(ApiResponse::success(
        "Quote",
        ClientQuoteView::from(&quote),
        Some(Meta::empty()),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn accept_quote(
    state: &AppState,
    token: &str,
    payload: AcceptQuoteRequest,
) -> AppResult<ApiResponse<ClientQuoteView>> {
    let command = QuoteCommand::Accept {
        signataire: payload.signataire,
    };
    let (quote, _) = respond(state, token, command).await?;
    Ok(ApiResponse::success(
        "Quote accepted",
        ClientQuoteView::from(&quote),
        Some(Meta::empty()),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn refuse_quote(
    state: &AppState,
    token: &str,
    payload: RefuseQuoteRequest,
) -> AppResult<ApiResponse<ClientQuoteView>> {
    let command = QuoteCommand::RefuseByClient {
        motif: payload.motif,
        details: payload.details,
    };
    let (quote, _) = respond(state, token, command).await?;
    Ok(ApiResponse::success(
        "Quote refused",
        ClientQuoteView::from(&quote),
        Some(Meta::empty()),
    ))
}
