pub mod auth;
pub mod public;
pub mod quotes;
pub mod settings;
