use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum QuoteStatus {
    #[serde(rename = "brouillon")]
    Draft,
    #[serde(rename = "valide")]
    Validated,
    #[serde(rename = "consulte")]
    Viewed,
    #[serde(rename = "accepte")]
    Accepted,
    #[serde(rename = "refuse_client")]
    RefusedByClient,
    #[serde(rename = "refuse_admin")]
    RefusedByAdmin,
    #[serde(rename = "expire")]
    Expired,
    #[serde(rename = "termine")]
    Finished,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 8] = [
        QuoteStatus::Draft,
        QuoteStatus::Validated,
        QuoteStatus::Viewed,
        QuoteStatus::Accepted,
        QuoteStatus::RefusedByClient,
        QuoteStatus::RefusedByAdmin,
        QuoteStatus::Expired,
        QuoteStatus::Finished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "brouillon",
            QuoteStatus::Validated => "valide",
            QuoteStatus::Viewed => "consulte",
            QuoteStatus::Accepted => "accepte",
            QuoteStatus::RefusedByClient => "refuse_client",
            QuoteStatus::RefusedByAdmin => "refuse_admin",
            QuoteStatus::Expired => "expire",
            QuoteStatus::Finished => "termine",
        }
    }

    /// Sent to the client and still awaiting an answer.
    pub fn is_open(&self) -> bool {
        matches!(self, QuoteStatus::Validated | QuoteStatus::Viewed)
    }

    /// Business won: accepted, possibly already delivered.
    pub fn is_won(&self) -> bool {
        matches!(self, QuoteStatus::Accepted | QuoteStatus::Finished)
    }

    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            QuoteStatus::RefusedByClient | QuoteStatus::RefusedByAdmin | QuoteStatus::Expired
        )
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown quote status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    #[serde(rename = "en_attente")]
    Pending,
    #[serde(rename = "acompte_paye")]
    DepositPaid,
    #[serde(rename = "paye")]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "en_attente",
            PaymentStatus::DepositPaid => "acompte_paye",
            PaymentStatus::Paid => "paye",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Virement,
    Cheque,
    Especes,
    Carte,
    Autre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    Prix,
    Delai,
    Concurrence,
    ProjetAbandonne,
    HorsPerimetre,
    SansReponse,
    Autre,
}

impl RefusalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalReason::Prix => "prix",
            RefusalReason::Delai => "delai",
            RefusalReason::Concurrence => "concurrence",
            RefusalReason::ProjetAbandonne => "projet_abandonne",
            RefusalReason::HorsPerimetre => "hors_perimetre",
            RefusalReason::SansReponse => "sans_reponse",
            RefusalReason::Autre => "autre",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefusedBy {
    Client,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientSnapshot {
    pub nom: String,
    pub entreprise: Option<String>,
    pub email: String,
    pub telephone: Option<String>,
}

impl ClientSnapshot {
    /// Key used to group revenue per client.
    pub fn display_name(&self) -> &str {
        self.entreprise
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.nom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub nb_pages: u32,
    #[serde(default)]
    pub options: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AffiliateDiscount {
    pub code: String,
    pub pourcentage: u8,
}

/// Amounts in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Amounts {
    pub ht_brut: i64,
    pub remise: i64,
    pub ht: i64,
    pub tva: i64,
    pub ttc: i64,
    pub acompte: i64,
    pub remise_affilie: Option<AffiliateDiscount>,
}

impl Amounts {
    pub fn balance(&self) -> i64 {
        self.ttc - self.acompte
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Acceptance {
    pub signataire: Option<String>,
    pub manuelle: bool,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Refusal {
    pub motif: RefusalReason,
    pub details: Option<String>,
    pub par: RefusedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub methode: PaymentMethod,
    pub date: DateTime<Utc>,
    pub montant: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Payments {
    pub acompte: Option<PaymentRecord>,
    pub solde: Option<PaymentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub numero: String,
    pub date: DateTime<Utc>,
    pub montant: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreditNote {
    pub numero: String,
    pub date: DateTime<Utc>,
    pub montant: i64,
    pub motif: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub date: DateTime<Utc>,
    pub texte: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reminder {
    pub date: DateTime<Utc>,
    pub canal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct QuoteDates {
    pub date_validation: Option<DateTime<Utc>>,
    pub date_limite: Option<DateTime<Utc>>,
    pub date_consultation: Option<DateTime<Utc>>,
    pub date_acceptation: Option<DateTime<Utc>>,
    pub date_refus: Option<DateTime<Utc>>,
    pub date_paiement_acompte: Option<DateTime<Utc>>,
    pub date_paiement_solde: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
}

/// A quote as stored: one JSON document per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub id: String,
    pub token: String,
    pub client: ClientSnapshot,
    pub projet: Project,
    pub montants: Amounts,
    pub statut: QuoteStatus,
    pub statut_paiement: PaymentStatus,
    pub date_creation: DateTime<Utc>,
    #[serde(flatten)]
    pub dates: QuoteDates,
    pub acceptation: Option<Acceptance>,
    pub refus: Option<Refusal>,
    #[serde(default)]
    pub paiements: Payments,
    pub facture_acompte: Option<Invoice>,
    pub facture_finale: Option<Invoice>,
    #[serde(default)]
    pub avoirs: Vec<CreditNote>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub relances: Vec<Reminder>,
    #[serde(default)]
    pub historique: Vec<HistoryEntry>,
    pub duplique_depuis: Option<String>,
}

impl Quote {
    pub fn push_history(&mut self, date: DateTime<Utc>, action: &str, details: impl Into<String>) {
        self.historique.push(HistoryEntry {
            date,
            action: action.to_string(),
            details: details.into(),
        });
    }

    pub fn credited_total(&self) -> i64 {
        self.avoirs.iter().map(|a| a.montant).sum()
    }
}

/// Global settings, one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    pub validity_days: i64,
    pub tva_rate_bp: i64,
    pub deposit_percent: i64,
    pub reminder_interval_days: i64,
    pub reminder_max: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            validity_days: 8,
            tva_rate_bp: 2000,
            deposit_percent: 50,
            reminder_interval_days: 3,
            reminder_max: 3,
        }
    }
}
