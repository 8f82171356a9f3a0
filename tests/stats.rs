use chrono::{DateTime, TimeZone, Utc};
use devis_backoffice::{
    lifecycle::{self, QuoteCommand, TransitionContext},
    models::{ClientSnapshot, Project, Quote, RefusalReason, Settings},
    pricing::compute_amounts,
    stats::compute,
};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
}

fn quote(id: &str, entreprise: &str, ht: i64, created: DateTime<Utc>) -> Quote {
    lifecycle::new_quote(
        id.to_string(),
        format!("token-{id}"),
        ClientSnapshot {
            nom: "Contact".into(),
            entreprise: Some(entreprise.into()),
            email: "contact@example.com".into(),
            telephone: None,
        },
        Project {
            nb_pages: 3,
            options: Vec::new(),
            description: None,
        },
        compute_amounts(ht, None, &Settings::default()),
        created,
    )
}

fn run(quote: &mut Quote, command: QuoteCommand, now: DateTime<Utc>) {
    let settings = Settings::default();
    lifecycle::apply(quote, &command, &TransitionContext::new(now, &settings)).unwrap();
}

/// Six quotes spread over January to March 2025, one in each interesting state.
fn portfolio() -> Vec<Quote> {
    let draft = quote("D-001", "Brouillon SARL", 100_000, at(2025, 3, 1));

    let mut open = quote("D-002", "Ouvert SAS", 100_000, at(2025, 3, 10));
    run(&mut open, QuoteCommand::Validate, at(2025, 3, 10));

    let mut accepted = quote("D-003", "Boulangerie Martin", 100_000, at(2025, 3, 1));
    run(&mut accepted, QuoteCommand::Validate, at(2025, 3, 1));
    run(
        &mut accepted,
        QuoteCommand::Accept {
            signataire: "Claire".into(),
        },
        at(2025, 3, 3),
    );

    let mut refused = quote("D-004", "Refus SA", 100_000, at(2025, 2, 10));
    run(&mut refused, QuoteCommand::Validate, at(2025, 2, 10));
    run(
        &mut refused,
        QuoteCommand::RefuseByClient {
            motif: RefusalReason::Prix,
            details: None,
        },
        at(2025, 2, 12),
    );

    let mut expired = quote("D-005", "Silence SARL", 100_000, at(2025, 1, 1));
    run(&mut expired, QuoteCommand::Validate, at(2025, 1, 1));
    assert!(lifecycle::expire_if_due(&mut expired, at(2025, 1, 20), 8));

    let mut delivered = quote("D-006", "Atelier Durand", 200_000, at(2025, 2, 1));
    run(&mut delivered, QuoteCommand::Validate, at(2025, 2, 1));
    run(&mut delivered, QuoteCommand::AcceptManually { details: None }, at(2025, 2, 5));
    run(&mut delivered, QuoteCommand::Finish, at(2025, 2, 20));

    vec![draft, open, accepted, refused, expired, delivered]
}

#[test]
fn empty_store_yields_zeroed_stats() {
    let stats = compute(&[], at(2025, 3, 15));
    assert_eq!(stats.total, 0);
    assert_eq!(stats.taux_conversion, 0.0);
    assert_eq!(stats.delai_moyen_acceptation_jours, None);
    assert!(stats.top_clients.is_empty());
    assert_eq!(stats.evolution.len(), 6);
    assert!(stats.evolution.iter().all(|p| p.devis == 0));
}

#[test]
fn counts_and_amounts_per_status() {
    let stats = compute(&portfolio(), at(2025, 3, 15));

    assert_eq!(stats.total, 6);
    assert_eq!(stats.par_statut.brouillon, 1);
    assert_eq!(stats.par_statut.valide, 1);
    assert_eq!(stats.par_statut.accepte, 1);
    assert_eq!(stats.par_statut.refuse_client, 1);
    assert_eq!(stats.par_statut.expire, 1);
    assert_eq!(stats.par_statut.termine, 1);

    // Drafts are excluded from amounts and rates.
    assert_eq!(stats.montant_total, 4 * 120_000 + 240_000);
    assert_eq!(stats.montant_accepte, 120_000 + 240_000);
    assert_eq!(stats.montant_en_attente, 120_000);
}

#[test]
fn rates_are_over_sent_quotes() {
    let stats = compute(&portfolio(), at(2025, 3, 15));

    assert_eq!(stats.taux_conversion, 40.0);
    assert_eq!(stats.taux_refus.client, 20.0);
    assert_eq!(stats.taux_refus.admin, 0.0);
    assert_eq!(stats.taux_refus.expiration, 20.0);
    assert_eq!(stats.delai_moyen_acceptation_jours, Some(3.0));
    assert_eq!(stats.motifs_refus.len(), 1);
    assert_eq!(stats.motifs_refus[0].motif, RefusalReason::Prix);
    assert_eq!(stats.motifs_refus[0].count, 1);
}

#[test]
fn top_clients_ranked_by_won_revenue() {
    let stats = compute(&portfolio(), at(2025, 3, 15));

    let names: Vec<&str> = stats.top_clients.iter().map(|c| c.client.as_str()).collect();
    assert_eq!(names, vec!["Atelier Durand", "Boulangerie Martin"]);
    assert_eq!(stats.top_clients[0].montant, 240_000);
    assert_eq!(stats.top_clients[0].devis, 1);
}

#[test]
fn monthly_histogram_covers_six_months() {
    let stats = compute(&portfolio(), at(2025, 3, 15));

    let months: Vec<&str> = stats.evolution.iter().map(|p| p.mois.as_str()).collect();
    assert_eq!(
        months,
        vec!["2024-10", "2024-11", "2024-12", "2025-01", "2025-02", "2025-03"]
    );

    let jan = &stats.evolution[3];
    assert_eq!((jan.devis, jan.acceptes), (1, 0));
    let feb = &stats.evolution[4];
    assert_eq!((feb.devis, feb.acceptes, feb.chiffre_affaires), (2, 1, 240_000));
    let mar = &stats.evolution[5];
    assert_eq!((mar.devis, mar.acceptes, mar.chiffre_affaires), (3, 1, 120_000));
}
