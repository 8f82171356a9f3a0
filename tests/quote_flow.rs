use chrono::{Datelike, Duration, Utc};
use devis_backoffice::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        public::{AcceptQuoteRequest, RefuseQuoteRequest},
        quotes::{QuoteActionRequest, QuoteDetail, QuoteDraftRequest},
    },
    error::AppError,
    lifecycle::QuoteCommand,
    middleware::auth::AuthUser,
    models::{ClientSnapshot, PaymentMethod, PaymentStatus, Project, QuoteStatus, RefusalReason},
    routes::params::QuoteListQuery,
    services::{auth_service, public_service, quote_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, Statement};

// Integration flow: draft -> validate -> client view/accept -> payments and invoices,
// then delete guards, duplication and the expiration sweep.
#[tokio::test]
async fn quote_lifecycle_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin_id =
        auth_service::upsert_user(&state.orm, "admin@example.com", "secret-password", "admin")
            .await?;
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };
    let year = Utc::now().year();

    // Non-admin callers are rejected.
    let visitor = AuthUser {
        user_id: admin_id,
        role: "user".into(),
    };
    let denied = quote_service::create_quote(&state, &visitor, draft_request("Ada")).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Create
    let created = quote_service::create_quote(&state, &admin, draft_request("Ada"))
        .await?
        .data
        .unwrap();
    assert_eq!(created.quote.id, "D-001");
    assert_eq!(created.quote.statut, QuoteStatus::Draft);
    assert_eq!(created.quote.montants.ttc, 120_000);
    assert_eq!(created.version, 1);
    assert!(created.lien_consultation.ends_with(&created.quote.token));
    let token = created.quote.token.clone();

    // Drafts are invisible behind the client link.
    let hidden = public_service::view_quote(&state, &token).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    // Validate, then a stale version is refused.
    let validated = act_at(&state, &admin, "D-001", QuoteCommand::Validate, Some(1)).await?;
    assert_eq!(validated.quote.statut, QuoteStatus::Validated);
    assert_eq!(validated.version, 2);
    let stale = quote_service::apply_action(
        &state,
        &admin,
        "D-001",
        QuoteActionRequest {
            command: QuoteCommand::AddNote {
                texte: "late".into(),
            },
            version: Some(1),
        },
    )
    .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    // Draft edits are closed once validated.
    let edit = quote_service::update_draft(&state, &admin, "D-001", draft_request("Ada")).await;
    assert!(matches!(edit, Err(AppError::InvalidTransition(_))));

    // Client views then accepts.
    let viewed = public_service::view_quote(&state, &token).await?.data.unwrap();
    assert_eq!(viewed.statut, QuoteStatus::Viewed);
    assert!(viewed.peut_repondre);
    let accepted = public_service::accept_quote(
        &state,
        &token,
        AcceptQuoteRequest {
            signataire: "Ada Lovelace".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(accepted.statut, QuoteStatus::Accepted);

    // Deposit invoice is refused before the deposit is paid.
    let early = act(&state, &admin, "D-001", QuoteCommand::IssueDepositInvoice).await;
    assert!(matches!(early, Err(AppError::InvalidTransition(_))));

    act(
        &state,
        &admin,
        "D-001",
        QuoteCommand::PayDeposit {
            methode: PaymentMethod::Virement,
            date: None,
        },
    )
    .await?;
    let invoiced = act(&state, &admin, "D-001", QuoteCommand::IssueDepositInvoice).await?;
    assert_eq!(
        invoiced.quote.facture_acompte.unwrap().numero,
        format!("F-{year}-0001")
    );

    act(&state, &admin, "D-001", QuoteCommand::Finish).await?;
    let paid = act(
        &state,
        &admin,
        "D-001",
        QuoteCommand::PayBalance {
            methode: PaymentMethod::Cheque,
            date: None,
        },
    )
    .await?;
    assert_eq!(paid.quote.statut_paiement, PaymentStatus::Paid);

    let final_invoice = act(&state, &admin, "D-001", QuoteCommand::IssueFinalInvoice).await?;
    let numero = final_invoice.quote.facture_finale.clone().unwrap().numero;
    assert_eq!(numero, format!("F-{year}-0002"));

    let again = act(&state, &admin, "D-001", QuoteCommand::IssueFinalInvoice).await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));
    let detail = quote_service::get_quote(&state, &admin, "D-001")
        .await?
        .data
        .unwrap();
    assert_eq!(detail.quote.facture_finale.unwrap().numero, numero);

    let credit = act(
        &state,
        &admin,
        "D-001",
        QuoteCommand::IssueCreditNote {
            montant: 1_000,
            motif: "Geste commercial".into(),
        },
    )
    .await?;
    assert_eq!(credit.quote.avoirs[0].numero, format!("A-{year}-0001"));

    // Finished quotes cannot be deleted.
    let kept = quote_service::delete_quote(&state, &admin, "D-001").await;
    assert!(matches!(kept, Err(AppError::InvalidTransition(_))));

    // A client refusal makes a quote deletable.
    let second = quote_service::create_quote(&state, &admin, draft_request("Grace"))
        .await?
        .data
        .unwrap();
    assert_eq!(second.quote.id, "D-002");
    act(&state, &admin, "D-002", QuoteCommand::Validate).await?;
    let refused = public_service::refuse_quote(
        &state,
        &second.quote.token,
        RefuseQuoteRequest {
            motif: RefusalReason::Delai,
            details: Some("Trop tard pour nous".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(refused.statut, QuoteStatus::RefusedByClient);
    assert!(!refused.peut_repondre);

    quote_service::delete_quote(&state, &admin, "D-002").await?;
    let list = quote_service::list_quotes(&state, &admin, QuoteListQuery::default())
        .await?
        .data
        .unwrap();
    assert!(list.items.iter().all(|q| q.id != "D-002"));
    assert_eq!(list.stats.total, 1);

    // Duplicate keeps the content and restarts the lifecycle.
    let copy = quote_service::duplicate_quote(&state, &admin, "D-001")
        .await?
        .data
        .unwrap();
    assert_eq!(copy.quote.id, "D-003");
    assert_eq!(copy.quote.statut, QuoteStatus::Draft);
    assert_eq!(copy.quote.duplique_depuis.as_deref(), Some("D-001"));
    assert!(copy.quote.facture_finale.is_none());
    assert_eq!(copy.quote.historique.len(), 1);

    // Sweep a validated quote past its window; drafts are left alone.
    let third = quote_service::create_quote(&state, &admin, draft_request("Linus"))
        .await?
        .data
        .unwrap();
    act(&state, &admin, &third.quote.id, QuoteCommand::Validate).await?;
    let none_yet = quote_service::sweep(&state, &admin).await?.data.unwrap();
    assert!(none_yet.expired.is_empty());

    let swept = quote_service::sweep_at(&state, &admin, Utc::now() + Duration::days(30))
        .await?
        .data
        .unwrap();
    assert_eq!(swept.expired, vec![third.quote.id.clone()]);
    let expired = quote_service::get_quote(&state, &admin, &third.quote.id)
        .await?
        .data
        .unwrap();
    assert_eq!(expired.quote.statut, QuoteStatus::Expired);
    assert_eq!(expired.quote.historique.last().unwrap().action, "expiration");

    let filtered = quote_service::list_quotes(
        &state,
        &admin,
        QuoteListQuery {
            status: Some(QuoteStatus::Draft),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    let ids: Vec<&str> = filtered.items.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["D-003"]);

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
    act_at(state, admin, id, command, None).await
}

async fn act_at(
    state: &AppState,
    admin: &AuthUser,
    id: &str,
    command: QuoteCommand,
    version: Option<i32>,
) -> Result<QuoteDetail, AppError> {
    let response =
        quote_service::apply_action(state, admin, id, QuoteActionRequest { command, version })
            .await?;
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
