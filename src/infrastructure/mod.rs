pub mod database;
pub mod entities;
pub mod repositories;
pub mod traits;
