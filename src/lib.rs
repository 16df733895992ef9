//! Localization state and translation cache for the civic issues client.
//!
//! The entry point is [`LocalizationService`]: it owns the current
//! language, resolves `namespace.key` identifiers through the static
//! dictionaries, translates free text through a remote provider with a
//! persistent TTL cache, and runs the language-change protocol.

pub mod cache;
pub mod config;
pub mod error;
pub mod i18n;
pub mod retry;
pub mod service;
pub mod store;
pub mod text_registry;
pub mod translation;

pub use error::{LocalizationError, ProviderError, StoreError};
pub use i18n::Language;
pub use service::{ChangeOutcome, LocalizationService, ServiceOptions};
