use chrono::{Duration, Utc};
use sea_orm::TransactionTrait;

use devis_backoffice::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    lifecycle::{self, QuoteCommand, TransitionContext},
    middleware::auth::ADMIN_ROLE,
    models::{ClientSnapshot, PaymentMethod, Project},
    pricing::compute_amounts,
    services::{
        auth_service::upsert_user,
        numbering::next_quote_id,
        quote_service::{insert_quote, new_token},
        settings_service::load_settings,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(pool, config);

    let email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());
    let admin_id = upsert_user(&state.orm, &email, &password, ADMIN_ROLE).await?;
    println!("Ensured admin {email} ({admin_id})");

    seed_quotes(&state).await?;
    Ok(())
}

/// Three sample quotes at different stages of the lifecycle.
async fn seed_quotes(state: &AppState) -> anyhow::Result<()> {
    let samples = [
        ("Boulangerie Martin", "contact@boulangerie-martin.fr", 5, 180_000, 0),
        ("Studio Lumière", "hello@studio-lumiere.fr", 8, 320_000, 1),
        ("Cabinet Durand", "secretariat@cabinet-durand.fr", 3, 95_000, 2),
    ];

    let txn = state.orm.begin().await?;
    let settings = load_settings(&txn).await?;
    let now = Utc::now();

    for (company, email, pages, ht, stage) in samples {
        let created = now - Duration::days(2);
        let id = next_quote_id(&txn).await?;
        let mut quote = lifecycle::new_quote(
            id,
            new_token(),
            ClientSnapshot {
                nom: company.to_string(),
                entreprise: Some(company.to_string()),
                email: email.to_string(),
                telephone: None,
            },
            Project {
                nb_pages: pages,
                options: vec!["responsive".into(), "seo".into()],
                description: Some(format!("Site vitrine {pages} pages")),
            },
            compute_amounts(ht, None, &settings),
            created,
        );

        let steps: Vec<QuoteCommand> = match stage {
            0 => vec![],
            1 => vec![QuoteCommand::Validate, QuoteCommand::MarkViewed],
            _ => vec![
                QuoteCommand::Validate,
                QuoteCommand::AcceptManually {
                    details: Some("Accord par téléphone".into()),
                },
                QuoteCommand::PayDeposit {
                    methode: PaymentMethod::Virement,
                    date: None,
                },
            ],
        };
        let ctx = TransitionContext::new(now, &settings);
        for step in &steps {
            lifecycle::apply(&mut quote, step, &ctx)?;
        }

        insert_quote(&txn, &quote, now).await?;
        println!("Seeded {} ({})", quote.id, quote.statut);
    }

    txn.commit().await?;
    Ok(())
}
