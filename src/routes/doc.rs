use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        public::{AcceptQuoteRequest, ClientQuoteView, RefuseQuoteRequest},
        quotes::{
            DeletedQuote, QuoteActionRequest, QuoteDetail, QuoteDraftRequest, QuoteList,
            ReminderList, SweepResult,
        },
        settings::UpdateSettingsRequest,
    },
    lifecycle::QuoteCommand,
    models::{
        Acceptance, AffiliateDiscount, Amounts, ClientSnapshot, CreditNote, HistoryEntry, Invoice,
        Note, PaymentMethod, PaymentRecord, PaymentStatus, Payments, Project, Quote, QuoteDates,
        QuoteStatus, Refusal, RefusalReason, RefusedBy, Reminder, Settings,
    },
    reminders::DueReminder,
    response::{ApiResponse, Meta},
    routes::{auth, health, public, quotes, settings},
    stats::{ClientRevenue, MonthlyPoint, QuoteStats, ReasonCount, RefusalRates, StatusCounts},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        quotes::list_quotes,
        quotes::create_quote,
        quotes::get_quote,
        quotes::update_quote,
        quotes::delete_quote,
        quotes::apply_action,
        quotes::duplicate_quote,
        quotes::sweep_expired,
        quotes::due_reminders,
        settings::get_settings,
        settings::update_settings,
        public::view_quote,
        public::accept_quote,
        public::refuse_quote
    ),
    components(
        schemas(
            Quote,
            QuoteDates,
            QuoteStatus,
            PaymentStatus,
            PaymentMethod,
            RefusalReason,
            RefusedBy,
            ClientSnapshot,
            Project,
            Amounts,
            AffiliateDiscount,
            HistoryEntry,
            Acceptance,
            Refusal,
            Payments,
            PaymentRecord,
            Invoice,
            CreditNote,
            Note,
            Reminder,
            Settings,
            QuoteCommand,
            QuoteActionRequest,
            QuoteDraftRequest,
            QuoteDetail,
            QuoteList,
            SweepResult,
            ReminderList,
            DeletedQuote,
            DueReminder,
            QuoteStats,
            StatusCounts,
            RefusalRates,
            ClientRevenue,
            MonthlyPoint,
            ReasonCount,
            UpdateSettingsRequest,
            ClientQuoteView,
            AcceptQuoteRequest,
            RefuseQuoteRequest,
            LoginRequest,
            LoginResponse,
            Meta,
            ApiResponse<QuoteDetail>,
            ApiResponse<QuoteList>,
            ApiResponse<ClientQuoteView>,
            ApiResponse<Settings>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Back-office authentication"),
        (name = "Quotes", description = "Quote lifecycle, invoicing and statistics"),
        (name = "Settings", description = "Global quote settings"),
        (name = "Client", description = "Client consultation link"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
