//! `PostgreSQL` adapter implementations.

mod models;
mod repository;
mod schema;

pub use repository::{MarketplacePgPool, PostgresMarketplaceRepository};
