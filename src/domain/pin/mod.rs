//! Verification code domain - Claim records and the code store contract

mod entity;
mod repository;

pub use entity::{ClaimRecord, CodeStatus, TransmissionRisk};
pub use repository::CodeStore;

#[cfg(test)]
pub use repository::MockCodeStore;
