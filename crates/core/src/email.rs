//! Email address normalization.
//!
//! Emails are the login selector and must be unique, so every store and
//! lookup goes through [`normalize_email`] first.

use crate::error::{DomainError, DomainResult};

/// Trim and lower-case an email address, rejecting obviously malformed input.
///
/// This is a shape check, not RFC 5322 validation: exactly one `@`, a
/// non-empty local part, and a domain containing a dot.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();

    if email.is_empty() {
        return Err(DomainError::validation("email must not be empty"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email must not contain whitespace"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(DomainError::validation("email must contain exactly one '@'")),
    };

    if local.is_empty() {
        return Err(DomainError::validation("email local part must not be empty"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(DomainError::validation("email domain is malformed"));
    }

    Ok(email)
}
