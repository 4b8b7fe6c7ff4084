//! Admin token storage
//!
//! The token is read from disk on every check so it can be rotated without a
//! restart. Its value is never logged.

use std::path::PathBuf;

use log::warn;

use crate::common::fs::read_trimmed;

/// Outcome of comparing a candidate against the stored token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    /// No token is stored; administration is disabled
    NotConfigured,
    Mismatch,
    Valid,
}

/// Reads the admin token from a fixed path
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Current token, or an empty string if none is stored
    pub fn load_token(&self) -> String {
        match read_trimmed(&self.path) {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                warn!("Could not read token file {}: {}", self.path.display(), e);
                String::new()
            }
        }
    }

    /// Compare `candidate` with the stored token
    pub fn check(&self, candidate: &str) -> TokenCheck {
        let stored = self.load_token();
        if stored.is_empty() {
            return TokenCheck::NotConfigured;
        }

        let candidate = candidate.trim();
        if !candidate.is_empty() && constant_time_compare(&stored, candidate) {
            TokenCheck::Valid
        } else {
            TokenCheck::Mismatch
        }
    }
}

/// Constant-time string comparison to prevent timing attacks
///
/// Only the length of the inputs leaks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}
