pub mod catalog;
pub mod models;
pub mod validator;

pub use catalog::{Catalog, CatalogError};
pub use models::*;
pub use validator::{normalize_for_match, QueryValidator, ValidatorRules, Verdict};
