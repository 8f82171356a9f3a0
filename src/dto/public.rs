use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Amounts, Project, Quote, QuoteStatus, RefusalReason};

/// What the client sees behind the consultation link. Internal notes,
/// history and payment records stay in the back-office.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientQuoteView {
    pub id: String,
    pub client: String,
    pub projet: Project,
    pub montants: Amounts,
    pub statut: QuoteStatus,
    pub date_creation: DateTime<Utc>,
    pub date_limite: Option<DateTime<Utc>>,
    pub peut_repondre: bool,
}

impl From<&Quote> for ClientQuoteView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.clone(),
            client: quote.client.display_name().to_string(),
            projet: quote.projet.clone(),
            montants: quote.montants.clone(),
            statut: quote.statut,
            date_creation: quote.date_creation,
            date_limite: quote.dates.date_limite,
            peut_repondre: quote.statut.is_open(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptQuoteRequest {
    pub signataire: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefuseQuoteRequest {
    pub motif: RefusalReason,
    pub details: Option<String>,
}
