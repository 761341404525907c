//! Password policies and random password generation.

use crate::error::PolicyError;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
/// ASCII punctuation, in code point order.
pub const SYMBOLS: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Default generated length.
pub const DEFAULT_LENGTH: usize = 16;

/// Which character classes to draw from, and how many characters to draw.
///
/// Frontends usually keep `length` within 6..=128; the policy itself accepts any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub length: usize,
    pub use_lowercase: bool,
    pub use_uppercase: bool,
    pub use_digits: bool,
    pub use_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            use_lowercase: true,
            use_uppercase: true,
            use_digits: true,
            use_symbols: true,
        }
    }
}

impl PasswordPolicy {
    /// Create the default policy (all classes, 16 characters).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Enabled alphabets concatenated as lowercase, uppercase, digits, symbols.
    pub fn character_pool(&self) -> Result<String, PolicyError> {
        let mut pool = String::new();
        if self.use_lowercase {
            pool.push_str(LOWERCASE);
        }
        if self.use_uppercase {
            pool.push_str(UPPERCASE);
        }
        if self.use_digits {
            pool.push_str(DIGITS);
        }
        if self.use_symbols {
            pool.push_str(SYMBOLS);
        }

        if pool.is_empty() {
            return Err(PolicyError::EmptyPool);
        }
        Ok(pool)
    }
}

/// Draw `policy.length` characters uniformly and independently from the pool.
///
/// Every character belongs to the pool, but an enabled class is not guaranteed to appear.
pub fn generate_password(policy: &PasswordPolicy) -> Result<String, PolicyError> {
    let pool: Vec<char> = policy.character_pool()?.chars().collect();
    let mut rng = OsRng;

    Ok((0..policy.length)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect())
}
