use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    lifecycle::QuoteCommand,
    models::{AffiliateDiscount, ClientSnapshot, Project, Quote},
    reminders::DueReminder,
    stats::QuoteStats,
};

/// Commercial content of a draft; amounts are derived server-side.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteDraftRequest {
    pub client: ClientSnapshot,
    pub projet: Project,
    /// Pre-tax amount before discount, in cents.
    pub ht: i64,
    pub remise_affilie: Option<AffiliateDiscount>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteActionRequest {
    #[serde(flatten)]
    pub command: QuoteCommand,
    /// Version the caller last read; stale versions are rejected.
    pub version: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: Quote,
    pub version: i32,
    pub lien_consultation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteList {
    pub items: Vec<Quote>,
    pub stats: QuoteStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResult {
    pub expired: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReminderList {
    pub items: Vec<DueReminder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedQuote {
    pub id: String,
}
