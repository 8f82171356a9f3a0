pub mod auth_service;
pub mod numbering;
pub mod public_service;
pub mod quote_service;
pub mod settings_service;
