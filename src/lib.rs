//! Public API for the security transaction entry engine.

pub mod batch;
pub mod config;
pub mod derive;
pub mod engine;
pub mod entity;
pub mod errors;
pub mod models;
pub mod money;
pub mod policy;
pub mod rates;
pub mod validation;
pub mod visibility;

pub use config::FormConfig;
pub use engine::{ConversionInput, FormListener, TransactionForm};
pub use entity::TransactionEntity;
pub use errors::FormError;
pub use models::{Client, Field, TransactionDraft, TransactionType};
pub use validation::ValidationError;
pub use visibility::Visibility;
