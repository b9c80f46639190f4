//! Member PINs: the shape a new PIN must have, and matching a presented
//! PIN against the Argon2id hash the member repository stored.

use std::borrow::Cow;

use argon2::password_hash::{Error as HashError, PasswordHash};
use argon2::{Argon2, PasswordVerifier};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// PIN rules of one deployment, borrowed from its [`AuthConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PinPolicy<'a> {
    config: &'a AuthConfig,
}

impl<'a> PinPolicy<'a> {
    pub fn new(config: &'a AuthConfig) -> Self {
        Self { config }
    }

    /// Refuse a PIN that may not be stored: anything but ASCII digits, or
    /// a length outside the configured bounds.
    pub fn check_new(&self, pin: &str) -> Result<(), AuthError> {
        if !is_digits(pin) {
            return Err(AuthError::WeakPin("PIN must contain digits only".into()));
        }
        let (min, max) = (self.config.min_pin_length, self.config.max_pin_length);
        if pin.len() < min || pin.len() > max {
            return Err(AuthError::WeakPin(format!(
                "PIN must be {min} to {max} digits long"
            )));
        }
        Ok(())
    }

    /// Whether `presented` is the PIN behind `stored_hash`.
    ///
    /// Input that no PIN could ever look like is a plain mismatch and
    /// never reaches Argon2. A stored hash that does not parse is
    /// `Crypto`: the member row is damaged, the caller is not at fault.
    pub fn matches(&self, presented: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let stored = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::Crypto(format!("stored PIN hash unreadable: {e}")))?;
        if !is_digits(presented) {
            return Ok(false);
        }
        match Argon2::default().verify_password(self.peppered(presented).as_bytes(), &stored) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("PIN verification failed: {e}"))),
        }
    }

    /// The pepper goes in front, matching how the member repository hashes.
    fn peppered<'p>(&self, pin: &'p str) -> Cow<'p, str> {
        match self.config.pepper.as_deref() {
            Some(pepper) => Cow::Owned(format!("{pepper}{pin}")),
            None => Cow::Borrowed(pin),
        }
    }
}

fn is_digits(pin: &str) -> bool {
    !pin.is_empty() && pin.bytes().all(|b| b.is_ascii_digit())
}
