//! Coworking room and desk booking backend - Library exports for testing
//!
//! (c) Softlandia 2025

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::config::Settings;
use crate::core::chat::ChatHub;
use crate::core::services::{
    DbBookingService, DbConversationService, DbEmailService, DbLocationService,
    DbNotificationService, DbUserService,
};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::repositories::{
    DbBookingRepository, DbConversationRepository, DbEmailTemplateRepository,
    DbLocationRepository, DbNotificationRepository, DbUserRepository,
};
use di::{Injectable, ServiceCollection};

/// Every service of the app. Connection, configuration and the chat hub
/// live for the whole process, the rest per request.
pub fn services() -> ServiceCollection {
    let mut services = ServiceCollection::new();

    services
        .add(Settings::singleton())
        .add(DatabaseConnection::singleton())
        .add(ChatHub::singleton())
        .add(DbLocationRepository::scoped())
        .add(DbBookingRepository::scoped())
        .add(DbUserRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(DbEmailTemplateRepository::scoped())
        .add(DbNotificationRepository::scoped())
        .add(DbLocationService::scoped())
        .add(DbBookingService::scoped())
        .add(DbUserService::scoped())
        .add(DbConversationService::scoped())
        .add(DbEmailService::scoped())
        .add(DbNotificationService::scoped());

    services
}
