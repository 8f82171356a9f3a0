use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Quote, QuoteStatus, RefusalReason};

const TOP_CLIENTS: usize = 5;
const HISTOGRAM_MONTHS: u32 = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub brouillon: u64,
    pub valide: u64,
    pub consulte: u64,
    pub accepte: u64,
    pub refuse_client: u64,
    pub refuse_admin: u64,
    pub expire: u64,
    pub termine: u64,
}

impl StatusCounts {
    fn bump(&mut self, status: QuoteStatus) {
        let slot = match status {
            QuoteStatus::Draft => &mut self.brouillon,
            QuoteStatus::Validated => &mut self.valide,
            QuoteStatus::Viewed => &mut self.consulte,
            QuoteStatus::Accepted => &mut self.accepte,
            QuoteStatus::RefusedByClient => &mut self.refuse_client,
            QuoteStatus::RefusedByAdmin => &mut self.refuse_admin,
            QuoteStatus::Expired => &mut self.expire,
            QuoteStatus::Finished => &mut self.termine,
        };
        *slot += 1;
    }
}

/// Percentages over quotes that left the draft state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RefusalRates {
    pub client: f64,
    pub admin: f64,
    pub expiration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClientRevenue {
    pub client: String,
    pub montant: i64,
    pub devis: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub mois: String,
    pub devis: u64,
    pub acceptes: u64,
    pub chiffre_affaires: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReasonCount {
    pub motif: RefusalReason,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuoteStats {
    pub total: u64,
    pub par_statut: StatusCounts,
    pub montant_total: i64,
    pub montant_accepte: i64,
    pub montant_en_attente: i64,
    pub taux_conversion: f64,
    pub taux_refus: RefusalRates,
    pub delai_moyen_acceptation_jours: Option<f64>,
    pub top_clients: Vec<ClientRevenue>,
    pub evolution: Vec<MonthlyPoint>,
    pub motifs_refus: Vec<ReasonCount>,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

fn month_key(date: DateTime<Utc>) -> (i32, u32) {
    (date.year(), date.month())
}

/// The `count` months ending with the month of `now`, oldest first.
fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<(i32, u32)> {
    let (mut year, mut month) = month_key(now);
    let mut months = Vec::with_capacity(count as usize);
    for _ in 0..count {
        months.push((year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

/// Full scan over every quote; nothing is cached between calls.
pub fn compute(quotes: &[Quote], now: DateTime<Utc>) -> QuoteStats {
    let mut counts = StatusCounts::default();
    let mut montant_total = 0;
    let mut montant_accepte = 0;
    let mut montant_en_attente = 0;
    let mut sent = 0u64;
    let mut won = 0u64;
    let mut acceptance_days = Vec::new();
    let mut per_client: BTreeMap<String, (i64, u64)> = BTreeMap::new();
    let mut reasons: BTreeMap<RefusalReason, u64> = BTreeMap::new();

    for quote in quotes {
        counts.bump(quote.statut);
        if quote.statut == QuoteStatus::Draft {
            continue;
        }
        sent += 1;
        montant_total += quote.montants.ttc;

        if quote.statut.is_open() {
            montant_en_attente += quote.montants.ttc;
        }

        if quote.statut.is_won() {
            won += 1;
            montant_accepte += quote.montants.ttc;
            let entry = per_client
                .entry(quote.client.display_name().to_string())
                .or_default();
            entry.0 += quote.montants.ttc;
            entry.1 += 1;

            if let Some(accepted_at) = quote.dates.date_acceptation {
                let from = quote.dates.date_validation.unwrap_or(quote.date_creation);
                let seconds = (accepted_at - from).num_seconds().max(0);
                acceptance_days.push(seconds as f64 / 86_400.0);
            }
        }

        if let Some(refus) = &quote.refus {
            *reasons.entry(refus.motif).or_default() += 1;
        }
    }

    let delai_moyen_acceptation_jours = if acceptance_days.is_empty() {
        None
    } else {
        let mean = acceptance_days.iter().sum::<f64>() / acceptance_days.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    let mut top_clients: Vec<ClientRevenue> = per_client
        .into_iter()
        .map(|(client, (montant, devis))| ClientRevenue {
            client,
            montant,
            devis,
        })
        .collect();
    top_clients.sort_by(|a, b| b.montant.cmp(&a.montant).then_with(|| a.client.cmp(&b.client)));
    top_clients.truncate(TOP_CLIENTS);

    let mut motifs_refus: Vec<ReasonCount> = reasons
        .into_iter()
        .map(|(motif, count)| ReasonCount { motif, count })
        .collect();
    motifs_refus.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.motif.cmp(&b.motif)));

    QuoteStats {
        total: quotes.len() as u64,
        taux_conversion: percent(won, sent),
        taux_refus: RefusalRates {
            client: percent(counts.refuse_client, sent),
            admin: percent(counts.refuse_admin, sent),
            expiration: percent(counts.expire, sent),
        },
        par_statut: counts,
        montant_total,
        montant_accepte,
        montant_en_attente,
        delai_moyen_acceptation_jours,
        top_clients,
        evolution: monthly_histogram(quotes, now),
        motifs_refus,
    }
}

fn monthly_histogram(quotes: &[Quote], now: DateTime<Utc>) -> Vec<MonthlyPoint> {
    let months = trailing_months(now, HISTOGRAM_MONTHS);
    let mut points: Vec<MonthlyPoint> = months
        .iter()
        .map(|(year, month)| MonthlyPoint {
            mois: format!("{year:04}-{month:02}"),
            devis: 0,
            acceptes: 0,
            chiffre_affaires: 0,
        })
        .collect();

    let slot = |date: DateTime<Utc>| months.iter().position(|m| *m == month_key(date));

    for quote in quotes {
        if let Some(i) = slot(quote.date_creation) {
            points[i].devis += 1;
        }
        if !quote.statut.is_won() {
            continue;
        }
        if let Some(i) = quote.dates.date_acceptation.and_then(slot) {
            points[i].acceptes += 1;
            points[i].chiffre_affaires += quote.montants.ttc;
        }
    }

    points
}
