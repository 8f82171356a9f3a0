use chrono::Duration;
use devis_backoffice::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        quotes::{QuoteActionRequest, QuoteDetail, QuoteDraftRequest},
        settings::UpdateSettingsRequest,
    },
    error::AppError,
    lifecycle::QuoteCommand,
    middleware::auth::AuthUser,
    models::{ClientSnapshot, Project},
    services::{auth_service, quote_service, settings_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn settings_validation_and_deadline_refresh() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run settings tests.");
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin_id =
        auth_service::upsert_user(&state.orm, "owner@example.com", "secret-password", "admin")
            .await?;
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    let invalid = settings_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            deposit_percent: Some(150),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    let created = quote_service::create_quote(&state, &admin, draft_request("Ada"))
        .await?
        .data
        .unwrap();
    let validated = act(&state, &admin, &created.quote.id, QuoteCommand::Validate).await?;
    let before = validated.quote.dates.date_limite.unwrap();

    let updated = settings_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            validity_days: Some(15),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.validity_days, 15);
    assert_eq!(updated.deposit_percent, 50);

    let after = quote_service::get_quote(&state, &admin, &created.quote.id)
        .await?
        .data
        .unwrap();
    assert_eq!(
        after.quote.dates.date_limite.unwrap() - before,
        Duration::days(7)
    );

    Ok(())
}

fn draft_request(nom: &str) -> QuoteDraftRequest {
    QuoteDraftRequest {
        client: ClientSnapshot {
            nom: nom.to_string(),
            entreprise: None,
            email: format!("{}@example.com", nom.to_lowercase()),
            telephone: None,
        },
        projet: Project {
            nb_pages: 4,
            options: vec!["blog".into()],
            description: Some("Site vitrine".into()),
        },
        ht: 100_000,
        remise_affilie: None,
    }
}

async fn act(
    state: &AppState,
    admin: &AuthUser,
    id: &str,
    command: QuoteCommand,
) -> Result<QuoteDetail, AppError> {
    let request = QuoteActionRequest {
        command,
        version: None,
    };
    let response = quote_service::apply_action(state, admin, id, request).await?;
    response.data.ok_or(AppError::NotFound)
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        public_base_url: "http://localhost:3000".into(),
    };
    let state = AppState::new(pool, config);

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    for sql in [
        "TRUNCATE TABLE audit_logs, quotes, users RESTART IDENTITY CASCADE",
        "UPDATE counters SET value = 0",
        "UPDATE settings SET validity_days = 8, tva_rate_bp = 2000, deposit_percent = 50, \
         reminder_interval_days = 3, reminder_max = 3 WHERE id = 1",
    ] {
        state
            .orm
            .execute(Statement::from_string(backend, sql))
            .await?;
    }

    Ok(state)
}
