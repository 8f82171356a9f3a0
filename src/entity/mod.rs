pub mod audit_logs;
pub mod counters;
pub mod quotes;
pub mod settings;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use counters::Entity as Counters;
pub use quotes::Entity as Quotes;
pub use settings::Entity as SettingsRow;
pub use users::Entity as Users;
