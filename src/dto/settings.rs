use serde::Deserialize;
use utoipa::ToSchema;

/// Partial update; absent fields keep their value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub validity_days: Option<i64>,
    pub tva_rate_bp: Option<i64>,
    pub deposit_percent: Option<i64>,
    pub reminder_interval_days: Option<i64>,
    pub reminder_max: Option<i64>,
}
