//! Outbound HTTP clients for sibling services.

pub mod auth;
pub mod catalog;

pub use auth::{HttpTokenValidator, TokenValidator};
pub use catalog::{CatalogClient, ProductInfo};
