use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set, TransactionTrait};

use crate::{
    audit::log_audit,
    dto::settings::UpdateSettingsRequest,
    entity::settings::{ActiveModel as SettingsActive, Entity as SettingsRow, Model as SettingsModel, SINGLETON_ID},
    error::{AppError, AppResult},
    lifecycle::refresh_deadline,
    middleware::auth::{AuthUser, ensure_admin},
    models::Settings,
    response::{ApiResponse, Meta},
    services::quote_service::{lock_open_quotes, save_quote},
    state::AppState,
};

fn settings_from_entity(model: &SettingsModel) -> Settings {
    Settings {
        validity_days: i64::from(model.validity_days),
        tva_rate_bp: i64::from(model.tva_rate_bp),
        deposit_percent: i64::from(model.deposit_percent),
        reminder_interval_days: i64::from(model.reminder_interval_days),
        reminder_max: i64::from(model.reminder_max),
    }
}

/// Reads the settings row, falling back to defaults when it was never written.
pub async fn load_settings<C: ConnectionTrait>(conn: &C) -> AppResult<Settings> {
    let row = SettingsRow::find_by_id(SINGLETON_ID).one(conn).await?;
    Ok(row.as_ref().map(settings_from_entity).unwrap_or_default())
}

fn in_range(name: &str, value: i64, min: i64, max: i64) -> AppResult<i32> {
    if !(min..=max).contains(&value) {
        return Err(AppError::Validation(format!(
            "{name} must be between {min} and {max}"
        )));
    }
    i32::try_from(value).map_err(|_| AppError::Validation(format!("{name} is out of range")))
}

pub async fn get_settings(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Settings>> {
    ensure_admin(user)?;
    let settings = load_settings(&state.orm).await?;
    Ok(ApiResponse::success("Settings", settings, Some(Meta::empty())))
}

#[tracing::instrument(skip_all)]
pub async fn update_settings(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateSettingsRequest,
) -> AppResult<ApiResponse<Settings>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let current = SettingsRow::find_by_id(SINGLETON_ID)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let before = current.as_ref().map(settings_from_entity).unwrap_or_default();

    let next = Settings {
        validity_days: payload.validity_days.unwrap_or(before.validity_days),
        tva_rate_bp: payload.tva_rate_bp.unwrap_or(before.tva_rate_bp),
        deposit_percent: payload.deposit_percent.unwrap_or(before.deposit_percent),
        reminder_interval_days: payload
            .reminder_interval_days
            .unwrap_or(before.reminder_interval_days),
        reminder_max: payload.reminder_max.unwrap_or(before.reminder_max),
    };

    let row = SettingsActive {
        id: Set(SINGLETON_ID),
        validity_days: Set(in_range("validity_days", next.validity_days, 1, 365)?),
        tva_rate_bp: Set(in_range("tva_rate_bp", next.tva_rate_bp, 0, 10_000)?),
        deposit_percent: Set(in_range("deposit_percent", next.deposit_percent, 0, 100)?),
        reminder_interval_days: Set(in_range(
            "reminder_interval_days",
            next.reminder_interval_days,
            1,
            90,
        )?),
        reminder_max: Set(in_range("reminder_max", next.reminder_max, 0, 20)?),
        updated_at: Set(now.into()),
    };
    match current {
        Some(_) => row.update(&txn).await?,
        None => row.insert(&txn).await?,
    };

    // A new validity window is forced onto every quote still awaiting an answer.
    let mut refreshed = Vec::new();
    if next.validity_days != before.validity_days {
        for (model, mut quote) in lock_open_quotes(&txn).await? {
            if refresh_deadline(&mut quote, next.validity_days) {
                save_quote(&txn, model, &quote, now).await?;
                refreshed.push(quote.id);
            }
        }
    }

    txn.commit().await?;

    tracing::info!(
        validity_days = next.validity_days,
        refreshed = refreshed.len(),
        "settings updated"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "settings_update",
        Some("settings"),
        None,
        Some(serde_json::json!({ "settings": &next, "refreshed_quotes": refreshed })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Settings updated", next, Some(Meta::empty())))
}
