//! Known-pin directive parsing.
//!
//! Reporters echo back the `pin-sha256` directives they had pinned. Each one
//! must be exactly `pin-sha256="<base64>"` (or single-quoted) and carry a
//! 32-byte SHA-256 digest.

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FormatError;
use crate::logging::structured::LogContext;
use crate::{log_debug, log_warn};

/// Raw length of a SHA-256 digest.
pub const PIN_DIGEST_LEN: usize = 32;

lazy_static! {
    /// Whole-token match; the value is whichever quote group matched.
    static ref PIN_DIRECTIVE: Regex =
        Regex::new(r#"\Apin-sha256=(?:"([^"]+)"|'([^']+)')\z"#).unwrap();
}

/// Parse one directive into its canonical base64 digest.
pub fn parse_known_pin(index: usize, token: &str) -> Result<String, FormatError> {
    let caps = PIN_DIRECTIVE
        .captures(token)
        .ok_or(FormatError::Directive { index })?;

    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .ok_or(FormatError::Directive { index })?;

    let digest = general_purpose::STANDARD
        .decode(value)
        .map_err(|_| FormatError::Base64 { index })?;

    if digest.len() != PIN_DIGEST_LEN {
        return Err(FormatError::DigestLength {
            index,
            len: digest.len(),
        });
    }

    Ok(general_purpose::STANDARD.encode(digest))
}

/// Parse every `known-pins` token, stopping at the first bad one.
///
/// Duplicates are passed through; the store collapses them.
pub fn parse_known_pins<S: AsRef<str>>(
    tokens: &[S],
    ctx: &LogContext,
) -> Result<Vec<String>, FormatError> {
    let pins = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| parse_known_pin(index, token.as_ref()))
        .collect::<Result<Vec<_>, _>>();

    match &pins {
        Ok(pins) => {
            log_debug!(ctx, "PINS_PARSED", count = pins.len());
        }
        Err(e) => {
            log_warn!(ctx, "PINS_REJECTED", error = e);
        }
    }

    pins
}
