//! Quote state machine.
//!
//! Every function here is pure: the caller supplies the clock, the settings
//! and, for invoices and credit notes, the document number allocated by the
//! counter. A command is fully checked before the record is touched, so a
//! rejected command leaves the quote exactly as it was.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{
    Acceptance, Amounts, ClientSnapshot, CreditNote, Invoice, Note, PaymentMethod,
    PaymentRecord, PaymentStatus, Payments, Project, Quote, QuoteDates, QuoteStatus, Refusal,
    RefusalReason, RefusedBy, Reminder, Settings,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot apply {action} to a quote in status {from}")]
    InvalidTransition {
        action: &'static str,
        from: QuoteStatus,
    },

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Validation(String),
}

/// One variant per transition; serialized with an `action` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action")]
pub enum QuoteCommand {
    #[serde(rename = "valider")]
    Validate,
    #[serde(rename = "marquer_consulte")]
    MarkViewed,
    #[serde(rename = "accepter")]
    Accept { signataire: String },
    #[serde(rename = "accepter_manuel")]
    AcceptManually { details: Option<String> },
    #[serde(rename = "refuser_client")]
    RefuseByClient {
        motif: RefusalReason,
        details: Option<String>,
    },
    #[serde(rename = "refuser_admin")]
    RefuseByAdmin {
        motif: RefusalReason,
        details: Option<String>,
    },
    #[serde(rename = "terminer")]
    Finish,
    #[serde(rename = "ajouter_note")]
    AddNote { texte: String },
    #[serde(rename = "enregistrer_relance")]
    RecordReminder { canal: Option<String> },
    #[serde(rename = "paiement_acompte")]
    PayDeposit {
        methode: PaymentMethod,
        date: Option<DateTime<Utc>>,
    },
    #[serde(rename = "paiement_solde")]
    PayBalance {
        methode: PaymentMethod,
        date: Option<DateTime<Utc>>,
    },
    #[serde(rename = "generer_facture_acompte")]
    IssueDepositInvoice,
    #[serde(rename = "generer_facture_finale")]
    IssueFinalInvoice,
    #[serde(rename = "generer_avoir")]
    IssueCreditNote { montant: i64, motif: String },
}

/// Sequences a command may draw a number from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    CreditNote,
}

impl QuoteCommand {
    pub fn action_name(&self) -> &'static str {
        match self {
            QuoteCommand::Validate => "valider",
            QuoteCommand::MarkViewed => "marquer_consulte",
            QuoteCommand::Accept { .. } => "accepter",
            QuoteCommand::AcceptManually { .. } => "accepter_manuel",
            QuoteCommand::RefuseByClient { .. } => "refuser_client",
            QuoteCommand::RefuseByAdmin { .. } => "refuser_admin",
            QuoteCommand::Finish => "terminer",
            QuoteCommand::AddNote { .. } => "ajouter_note",
            QuoteCommand::RecordReminder { .. } => "enregistrer_relance",
            QuoteCommand::PayDeposit { .. } => "paiement_acompte",
            QuoteCommand::PayBalance { .. } => "paiement_solde",
            QuoteCommand::IssueDepositInvoice => "generer_facture_acompte",
            QuoteCommand::IssueFinalInvoice => "generer_facture_finale",
            QuoteCommand::IssueCreditNote { .. } => "generer_avoir",
        }
    }

    pub fn document_kind(&self) -> Option<DocumentKind> {
        match self {
            QuoteCommand::IssueDepositInvoice | QuoteCommand::IssueFinalInvoice => {
                Some(DocumentKind::Invoice)
            }
            QuoteCommand::IssueCreditNote { .. } => Some(DocumentKind::CreditNote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The command was legal but had nothing to do (re-viewing a quote).
    Unchanged,
}

pub struct TransitionContext<'a> {
    pub now: DateTime<Utc>,
    pub settings: &'a Settings,
    pub document_number: Option<String>,
}

impl<'a> TransitionContext<'a> {
    pub fn new(now: DateTime<Utc>, settings: &'a Settings) -> Self {
        Self {
            now,
            settings,
            document_number: None,
        }
    }

    pub fn with_document_number(mut self, number: impl Into<String>) -> Self {
        self.document_number = Some(number.into());
        self
    }
}

pub fn deadline(date_creation: DateTime<Utc>, validity_days: i64) -> DateTime<Utc> {
    date_creation + Duration::days(validity_days)
}

pub fn is_expired(now: DateTime<Utc>, date_creation: DateTime<Utc>, validity_days: i64) -> bool {
    now > deadline(date_creation, validity_days)
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn invalid(action: &'static str, from: QuoteStatus) -> TransitionError {
    TransitionError::InvalidTransition { action, from }
}

pub fn validate_client(client: &ClientSnapshot) -> Result<(), TransitionError> {
    if blank(&client.nom) {
        return Err(TransitionError::Validation("client.nom is required".into()));
    }
    if blank(&client.email) || !client.email.contains('@') {
        return Err(TransitionError::Validation(
            "client.email must be a valid address".into(),
        ));
    }
    Ok(())
}

/// Largest accepted pre-tax amount, in cents.
pub const MAX_HT_CENTS: i64 = 1_000_000_000_000;

pub fn validate_amount_input(ht_brut: i64, pourcentage: Option<u8>) -> Result<(), TransitionError> {
    if ht_brut < 0 {
        return Err(TransitionError::Validation("ht must not be negative".into()));
    }
    if ht_brut > MAX_HT_CENTS {
        return Err(TransitionError::Validation(format!(
            "ht must not exceed {MAX_HT_CENTS} cents"
        )));
    }
    if pourcentage.is_some_and(|p| p > 100) {
        return Err(TransitionError::Validation(
            "remise_affilie.pourcentage must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

/// Checks whether `command` may be applied, without touching the quote.
///
/// Document numbers are not required here so callers can validate before
/// drawing a number from the counter.
pub fn check(
    quote: &Quote,
    command: &QuoteCommand,
    ctx: &TransitionContext<'_>,
) -> Result<Outcome, TransitionError> {
    let action = command.action_name();
    let status = quote.statut;

    match command {
        QuoteCommand::Validate => {
            if status != QuoteStatus::Draft {
                return Err(invalid(action, status));
            }
        }
        QuoteCommand::MarkViewed => {
            if status == QuoteStatus::Draft {
                return Err(invalid(action, status));
            }
            if status != QuoteStatus::Validated {
                return Ok(Outcome::Unchanged);
            }
        }
        QuoteCommand::Accept { signataire } => {
            if !status.is_open() {
                return Err(invalid(action, status));
            }
            if is_expired(ctx.now, quote.date_creation, ctx.settings.validity_days) {
                return Err(TransitionError::Precondition(
                    "The validity period of this quote is over".into(),
                ));
            }
            if blank(signataire) {
                return Err(TransitionError::Validation("signataire is required".into()));
            }
        }
        QuoteCommand::AcceptManually { .. } => {
            if !status.is_open() {
                return Err(invalid(action, status));
            }
        }
        QuoteCommand::RefuseByClient { .. } | QuoteCommand::RefuseByAdmin { .. } => {
            if !status.is_open() {
                return Err(invalid(action, status));
            }
        }
        QuoteCommand::Finish => {
            if status != QuoteStatus::Accepted {
                return Err(invalid(action, status));
            }
        }
        QuoteCommand::AddNote { texte } => {
            if blank(texte) {
                return Err(TransitionError::Validation("texte is required".into()));
            }
        }
        QuoteCommand::RecordReminder { .. } => {
            if !status.is_open() {
                return Err(invalid(action, status));
            }
        }
        QuoteCommand::PayDeposit { .. } => {
            if !status.is_won() {
                return Err(invalid(action, status));
            }
            if quote.statut_paiement != PaymentStatus::Pending {
                return Err(TransitionError::Precondition(format!(
                    "Deposit already recorded (payment status {})",
                    quote.statut_paiement
                )));
            }
        }
        QuoteCommand::PayBalance { .. } => {
            if status != QuoteStatus::Finished {
                return Err(invalid(action, status));
            }
            match quote.statut_paiement {
                PaymentStatus::DepositPaid => {}
                PaymentStatus::Pending => {
                    return Err(TransitionError::Precondition(
                        "The deposit must be paid before the balance".into(),
                    ));
                }
                PaymentStatus::Paid => {
                    return Err(TransitionError::Precondition(
                        "The balance is already paid".into(),
                    ));
                }
            }
        }
        QuoteCommand::IssueDepositInvoice => {
            if quote.statut_paiement == PaymentStatus::Pending {
                return Err(TransitionError::Precondition(
                    "The deposit invoice requires a paid deposit".into(),
                ));
            }
            if let Some(existing) = &quote.facture_acompte {
                return Err(TransitionError::Precondition(format!(
                    "Deposit invoice already issued ({})",
                    existing.numero
                )));
            }
        }
        QuoteCommand::IssueFinalInvoice => {
            if quote.statut_paiement != PaymentStatus::Paid {
                return Err(TransitionError::Precondition(
                    "The final invoice requires a fully paid quote".into(),
                ));
            }
            if let Some(existing) = &quote.facture_finale {
                return Err(TransitionError::Precondition(format!(
                    "Final invoice already issued ({})",
                    existing.numero
                )));
            }
        }
        QuoteCommand::IssueCreditNote { montant, motif } => {
            if quote.facture_acompte.is_none() && quote.facture_finale.is_none() {
                return Err(TransitionError::Precondition(
                    "A credit note requires an issued invoice".into(),
                ));
            }
            if *montant <= 0 {
                return Err(TransitionError::Validation("montant must be positive".into()));
            }
            if blank(motif) {
                return Err(TransitionError::Validation("motif is required".into()));
            }
            if *montant > quote.montants.ttc - quote.credited_total() {
                return Err(TransitionError::Precondition(
                    "Credited total would exceed the quote total".into(),
                ));
            }
        }
    }

    Ok(Outcome::Applied)
}

/// Applies `command` to `quote`, appending one history entry when it fires.
pub fn apply(
    quote: &mut Quote,
    command: &QuoteCommand,
    ctx: &TransitionContext<'_>,
) -> Result<Outcome, TransitionError> {
    if check(quote, command, ctx)? == Outcome::Unchanged {
        return Ok(Outcome::Unchanged);
    }

    let now = ctx.now;
    let action = command.action_name();
    let number = match (command.document_kind(), &ctx.document_number) {
        (Some(_), None) => {
            return Err(TransitionError::Precondition(format!(
                "{action} needs a document number"
            )));
        }
        (_, number) => number.clone().unwrap_or_default(),
    };

    let details = match command {
        QuoteCommand::Validate => {
            let limit = deadline(quote.date_creation, ctx.settings.validity_days);
            quote.statut = QuoteStatus::Validated;
            quote.dates.date_validation.get_or_insert(now);
            quote.dates.date_limite = Some(limit);
            format!("Devis validé, valable jusqu'au {}", limit.format("%d/%m/%Y"))
        }
        QuoteCommand::MarkViewed => {
            quote.statut = QuoteStatus::Viewed;
            quote.dates.date_consultation.get_or_insert(now);
            "Devis consulté par le client".to_string()
        }
        QuoteCommand::Accept { signataire } => {
            let signataire = signataire.trim().to_string();
            quote.statut = QuoteStatus::Accepted;
            quote.dates.date_acceptation.get_or_insert(now);
            quote.acceptation = Some(Acceptance {
                signataire: Some(signataire.clone()),
                manuelle: false,
                details: None,
            });
            format!("Devis accepté en ligne par {signataire}")
        }
        QuoteCommand::AcceptManually { details } => {
            let details = non_blank(details.as_ref());
            quote.statut = QuoteStatus::Accepted;
            quote.dates.date_acceptation.get_or_insert(now);
            quote.acceptation = Some(Acceptance {
                signataire: None,
                manuelle: true,
                details: details.clone(),
            });
            match details {
                Some(d) => format!("Acceptation enregistrée manuellement: {d}"),
                None => "Acceptation enregistrée manuellement".to_string(),
            }
        }
        QuoteCommand::RefuseByClient { motif, details } => {
            refuse(quote, RefusedBy::Client, *motif, details.as_ref(), now)
        }
        QuoteCommand::RefuseByAdmin { motif, details } => {
            refuse(quote, RefusedBy::Admin, *motif, details.as_ref(), now)
        }
        QuoteCommand::Finish => {
            quote.statut = QuoteStatus::Finished;
            quote.dates.date_fin.get_or_insert(now);
            "Projet livré".to_string()
        }
        QuoteCommand::AddNote { texte } => {
            let texte = texte.trim().to_string();
            quote.notes.push(Note {
                date: now,
                texte: texte.clone(),
            });
            texte
        }
        QuoteCommand::RecordReminder { canal } => {
            let canal = non_blank(canal.as_ref());
            quote.relances.push(Reminder {
                date: now,
                canal: canal.clone(),
            });
            let count = quote.relances.len();
            match canal {
                Some(c) => format!("Relance n°{count} envoyée ({c})"),
                None => format!("Relance n°{count} envoyée"),
            }
        }
        QuoteCommand::PayDeposit { methode, date } => {
            let paid_at = date.unwrap_or(now);
            let montant = quote.montants.acompte;
            quote.statut_paiement = PaymentStatus::DepositPaid;
            quote.dates.date_paiement_acompte.get_or_insert(paid_at);
            quote.paiements.acompte = Some(PaymentRecord {
                methode: *methode,
                date: paid_at,
                montant,
            });
            format!("Acompte de {} reçu ({:?})", format_cents(montant), methode)
        }
        QuoteCommand::PayBalance { methode, date } => {
            let paid_at = date.unwrap_or(now);
            let montant = quote.montants.balance();
            quote.statut_paiement = PaymentStatus::Paid;
            quote.dates.date_paiement_solde.get_or_insert(paid_at);
            quote.paiements.solde = Some(PaymentRecord {
                methode: *methode,
                date: paid_at,
                montant,
            });
            format!("Solde de {} reçu ({:?})", format_cents(montant), methode)
        }
        QuoteCommand::IssueDepositInvoice => {
            let montant = quote.montants.acompte;
            quote.facture_acompte = Some(Invoice {
                numero: number.clone(),
                date: now,
                montant,
            });
            format!("Facture d'acompte {number} ({})", format_cents(montant))
        }
        QuoteCommand::IssueFinalInvoice => {
            let montant = quote.montants.balance();
            quote.facture_finale = Some(Invoice {
                numero: number.clone(),
                date: now,
                montant,
            });
            format!("Facture de solde {number} ({})", format_cents(montant))
        }
        QuoteCommand::IssueCreditNote { montant, motif } => {
            quote.avoirs.push(CreditNote {
                numero: number.clone(),
                date: now,
                montant: *montant,
                motif: motif.trim().to_string(),
            });
            format!("Avoir {number} de {}: {}", format_cents(*montant), motif.trim())
        }
    };

    quote.push_history(now, action, details);
    Ok(Outcome::Applied)
}

fn refuse(
    quote: &mut Quote,
    par: RefusedBy,
    motif: RefusalReason,
    details: Option<&String>,
    now: DateTime<Utc>,
) -> String {
    let details = non_blank(details);
    quote.statut = match par {
        RefusedBy::Client => QuoteStatus::RefusedByClient,
        RefusedBy::Admin => QuoteStatus::RefusedByAdmin,
    };
    quote.dates.date_refus.get_or_insert(now);
    quote.refus = Some(Refusal {
        motif,
        details: details.clone(),
        par,
    });
    let who = match par {
        RefusedBy::Client => "client",
        RefusedBy::Admin => "administrateur",
    };
    match details {
        Some(d) => format!("Refus {who} ({}): {d}", motif.as_str()),
        None => format!("Refus {who} ({})", motif.as_str()),
    }
}

/// Moves an open quote past its validity window to `expire`.
///
/// Returns whether the quote changed. Calling it again is a no-op.
pub fn expire_if_due(quote: &mut Quote, now: DateTime<Utc>, validity_days: i64) -> bool {
    if !quote.statut.is_open() || !is_expired(now, quote.date_creation, validity_days) {
        return false;
    }
    let limit = deadline(quote.date_creation, validity_days);
    quote.statut = QuoteStatus::Expired;
    quote.dates.date_limite = Some(limit);
    quote.push_history(
        now,
        "expiration",
        format!("Devis expiré le {}", limit.format("%d/%m/%Y")),
    );
    true
}

/// Re-derives the deadline of an open quote after the validity window changed.
pub fn refresh_deadline(quote: &mut Quote, validity_days: i64) -> bool {
    if !quote.statut.is_open() {
        return false;
    }
    let limit = Some(deadline(quote.date_creation, validity_days));
    if quote.dates.date_limite == limit {
        return false;
    }
    quote.dates.date_limite = limit;
    true
}

pub fn new_quote(
    id: String,
    token: String,
    client: ClientSnapshot,
    projet: Project,
    montants: Amounts,
    now: DateTime<Utc>,
) -> Quote {
    let mut quote = Quote {
        id,
        token,
        client,
        projet,
        montants,
        statut: QuoteStatus::Draft,
        statut_paiement: PaymentStatus::Pending,
        date_creation: now,
        dates: QuoteDates::default(),
        acceptation: None,
        refus: None,
        paiements: Payments::default(),
        facture_acompte: None,
        facture_finale: None,
        avoirs: Vec::new(),
        notes: Vec::new(),
        relances: Vec::new(),
        historique: Vec::new(),
        duplique_depuis: None,
    };
    let details = format!(
        "Devis créé pour {} ({})",
        quote.client.display_name(),
        format_cents(quote.montants.ttc)
    );
    quote.push_history(now, "creation", details);
    quote
}

pub fn edit_draft(
    quote: &mut Quote,
    client: ClientSnapshot,
    projet: Project,
    montants: Amounts,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    if quote.statut != QuoteStatus::Draft {
        return Err(invalid("modifier", quote.statut));
    }
    validate_client(&client)?;
    quote.client = client;
    quote.projet = projet;
    quote.montants = montants;
    let details = format!("Devis modifié ({})", format_cents(quote.montants.ttc));
    quote.push_history(now, "modification", details);
    Ok(())
}

/// Copies the commercial content of `origin` into a fresh draft.
pub fn duplicate(origin: &Quote, id: String, token: String, now: DateTime<Utc>) -> Quote {
    let mut copy = new_quote(
        id,
        token,
        origin.client.clone(),
        origin.projet.clone(),
        origin.montants.clone(),
        now,
    );
    copy.historique.clear();
    copy.duplique_depuis = Some(origin.id.clone());
    copy.push_history(now, "duplication", format!("Dupliqué depuis {}", origin.id));
    copy
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02} €", abs / 100, abs % 100)
}
