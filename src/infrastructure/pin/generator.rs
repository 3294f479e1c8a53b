//! Verification code generation
//!
//! Generates random codes from a configurable alphabet.

use rand::Rng;

use crate::domain::DomainError;

/// Digits only, suitable for codes read out over the phone
pub const NUMERIC_CHARSET: &str = "0123456789";

/// Upper-case letters and digits without easily confused glyphs
pub const ALPHANUMERIC_CHARSET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generator for random verification codes
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
    charset: Vec<char>,
}

impl CodeGenerator {
    /// Creates a generator, rejecting empty lengths and degenerate alphabets
    pub fn new(length: usize, charset: &str) -> Result<Self, DomainError> {
        if length == 0 {
            return Err(DomainError::configuration("Code length must be greater than zero"));
        }

        let mut chars: Vec<char> = charset.chars().collect();
        chars.sort_unstable();
        chars.dedup();

        if chars.len() < 2 {
            return Err(DomainError::configuration(
                "Code charset must contain at least two distinct characters",
            ));
        }

        Ok(Self {
            length,
            charset: chars,
        })
    }

    /// Numeric codes of the given length
    pub fn numeric(length: usize) -> Result<Self, DomainError> {
        Self::new(length, NUMERIC_CHARSET)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct codes this generator can produce
    pub fn keyspace(&self) -> f64 {
        (self.charset.len() as f64).powi(self.length as i32)
    }

    /// Generates a new random code
    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();

        (0..self.length)
            .map(|_| self.charset[rng.gen_range(0..self.charset.len())])
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            length: 8,
            charset: NUMERIC_CHARSET.chars().collect(),
        }
    }
}
