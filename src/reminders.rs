use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    lifecycle::{deadline, is_expired},
    models::{Quote, QuoteStatus, Settings},
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DueReminder {
    pub id: String,
    pub client: String,
    pub email: String,
    pub statut: QuoteStatus,
    pub relances_envoyees: u64,
    pub jours_sans_reponse: i64,
    pub date_limite: DateTime<Utc>,
}

/// Open quotes whose client has been silent long enough to be chased again.
pub fn due_reminders(quotes: &[Quote], settings: &Settings, now: DateTime<Utc>) -> Vec<DueReminder> {
    let interval = Duration::days(settings.reminder_interval_days);
    let mut due: Vec<DueReminder> = quotes
        .iter()
        .filter(|q| q.statut.is_open())
        .filter(|q| !is_expired(now, q.date_creation, settings.validity_days))
        .filter(|q| (q.relances.len() as i64) < settings.reminder_max)
        .filter_map(|q| {
            let last_contact = q
                .relances
                .iter()
                .map(|r| r.date)
                .max()
                .or(q.dates.date_validation)
                .unwrap_or(q.date_creation);
            let silent_for = now - last_contact;
            if silent_for < interval {
                return None;
            }
            Some(DueReminder {
                id: q.id.clone(),
                client: q.client.display_name().to_string(),
                email: q.client.email.clone(),
                statut: q.statut,
                relances_envoyees: q.relances.len() as u64,
                jours_sans_reponse: silent_for.num_days(),
                date_limite: deadline(q.date_creation, settings.validity_days),
            })
        })
        .collect();
    due.sort_by(|a, b| a.date_limite.cmp(&b.date_limite).then_with(|| a.id.cmp(&b.id)));
    due
}
