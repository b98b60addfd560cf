//! Device-catalog cache, build lookups and menu navigation for the BlissROMs bot.

pub mod access;
pub mod builds;
pub mod cache;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
mod hashing;
pub mod menu;
pub mod render;

#[cfg(test)]
mod testing;

pub use access::Access;
pub use builds::{Build, BuildResolver, BuildSet, Variant};
pub use cache::{CatalogCache, RefreshOutcome};
pub use catalog::{DeviceCatalog, DeviceEntry};
pub use commands::{Assistant, Command, Invocation};
pub use config::{BotConfig, ChangeDetection};
pub use error::{CatalogError, ConfigError, FetchError, InvalidToken};
pub use fetch::CatalogFetcher;
pub use menu::{CallbackOutcome, ChatKind, Menu, MenuState};
pub use render::{Button, ButtonAction, Keyboard, ParseMode, Reply};
