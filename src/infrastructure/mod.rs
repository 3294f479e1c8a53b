//! Infrastructure layer - Backend implementations and services

pub mod cache;
pub mod logging;
pub mod pin;
pub mod rate_limit;
pub mod services;
