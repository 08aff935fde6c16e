use catalog::{CatalogCache, SheetSource};
use session::SessionStore;
use teloxide::types::UserId;

pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod keyboard;
pub mod question;
pub mod runner;
pub mod schema;
pub mod session;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
pub type Sessions = SessionStore<UserId>;
pub type SheetCache = CatalogCache<SheetSource>;
