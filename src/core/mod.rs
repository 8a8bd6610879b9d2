pub mod availability;
pub mod chat;
pub mod services;
pub mod templates;
pub mod traits;
