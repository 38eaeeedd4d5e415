// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Password Strength Gate
//!
//! First-time key creation binds every future client of the account to the
//! chosen password, so it is checked with zxcvbn before a key is derived.
//! Requires at least 8 characters and a score of 3 (out of 4).

use zxcvbn::Score;

use super::KeyError;

/// Password strength levels based on zxcvbn scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    /// Score 3: Safely unguessable (moderate protection from offline attacks)
    Strong,
    /// Score 4: Very unguessable (strong protection from offline attacks)
    VeryStrong,
}

/// Minimum password length requirement.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum zxcvbn score required (0-4 scale).
const MIN_REQUIRED_SCORE: Score = Score::Three;

/// Checks that `password` is strong enough to protect a new encryption key.
///
/// # Examples
/// ```
/// use sealbook_core::keys::password::check_password_strength;
///
/// assert!(check_password_strength("password").is_err());
/// assert!(check_password_strength("correct-horse-battery-staple").is_ok());
/// ```
pub fn check_password_strength(password: &str) -> Result<PasswordStrength, KeyError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(KeyError::WeakPassword {
            feedback: format!("Use at least {} characters.", MIN_PASSWORD_LENGTH),
        });
    }

    let estimate = zxcvbn::zxcvbn(password, &[]);
    let score = estimate.score();

    if score < MIN_REQUIRED_SCORE {
        return Err(KeyError::WeakPassword {
            feedback: feedback_text(&estimate),
        });
    }

    Ok(if score == Score::Four {
        PasswordStrength::VeryStrong
    } else {
        PasswordStrength::Strong
    })
}

fn feedback_text(estimate: &zxcvbn::Entropy) -> String {
    let mut parts = Vec::new();

    if let Some(feedback) = estimate.feedback() {
        if let Some(warning) = feedback.warning() {
            parts.push(warning.to_string());
        }
        for suggestion in feedback.suggestions() {
            parts.push(suggestion.to_string());
        }
    }

    parts.join(" ")
}
