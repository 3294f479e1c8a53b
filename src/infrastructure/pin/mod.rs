//! Verification code infrastructure - Code stores and generation

mod factory;
mod generator;
mod in_memory;
mod postgres;

pub use factory::{CodeStoreConfig, CodeStoreFactory, CodeStoreType};
pub use generator::{CodeGenerator, ALPHANUMERIC_CHARSET, NUMERIC_CHARSET};
pub use in_memory::InMemoryCodeStore;
pub use postgres::{PostgresCodeStore, PostgresConfig};
