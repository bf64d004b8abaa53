//! Parsers for the small value languages embedded in Compose fields:
//! durations, byte sizes and shell-style command strings.

use c2m_common::error::{ConvertError, Result};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Parses a Compose duration (`1m30s`, `500ms`, `10`) into nanoseconds.
///
/// A bare number is read as seconds. Fractional amounts (`1.5s`) are
/// valid Compose durations, which rules out `humantime` here.
///
/// # Errors
///
/// Returns an error on unknown units or malformed numbers.
pub fn parse_duration_nanos(input: &str) -> Result<u64> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(secs.saturating_mul(NANOS_PER_SECOND));
    }

    let mut total: u64 = 0;
    let mut rest = input;
    if rest.is_empty() {
        return Err(invalid("duration", input));
    }
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid("duration", input))?;
        let amount: f64 = rest[..digits]
            .parse()
            .map_err(|_| invalid("duration", input))?;
        let unit_rest = &rest[digits..];
        let unit_len = unit_rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(unit_rest.len());
        let factor: f64 = match &unit_rest[..unit_len] {
            "h" => 3_600e9,
            "m" => 60e9,
            "s" => 1e9,
            "ms" => 1e6,
            "us" | "\u{b5}s" => 1e3,
            "ns" => 1.0,
            _ => return Err(invalid("duration", input)),
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (amount * factor).round() as u64;
        total = total.saturating_add(nanos);
        rest = &unit_rest[unit_len..];
    }
    Ok(total)
}

/// Converts a duration to whole seconds, rounding down.
pub const fn nanos_to_secs(nanos: u64) -> u64 {
    nanos / NANOS_PER_SECOND
}

/// Parses an engine byte size (`512m`, `1gb`, `1024`) into bytes.
///
/// # Errors
///
/// Returns an error on unknown suffixes or malformed numbers.
pub fn parse_bytes(input: &str) -> Result<u64> {
    let lower = input.trim().to_ascii_lowercase();
    let trimmed = lower.strip_suffix('b').unwrap_or(&lower);
    let (number, multiplier) = match trimmed.chars().last() {
        Some('k') => (&trimmed[..trimmed.len() - 1], 1u64 << 10),
        Some('m') => (&trimmed[..trimmed.len() - 1], 1 << 20),
        Some('g') => (&trimmed[..trimmed.len() - 1], 1 << 30),
        Some('t') => (&trimmed[..trimmed.len() - 1], 1 << 40),
        Some(_) => (trimmed, 1),
        None => return Err(invalid("byte size", input)),
    };
    let value: f64 = number.trim().parse().map_err(|_| invalid("byte size", input))?;
    if value < 0.0 {
        return Err(invalid("byte size", input));
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let bytes = (value * multiplier as f64) as u64;
    Ok(bytes)
}

/// Splits a command string the way a POSIX shell tokenizes words.
///
/// Handles single quotes, double quotes with backslash escapes, and
/// backslash escapes outside quotes. No expansion is performed.
///
/// # Errors
///
/// Returns an error on an unterminated quote or trailing backslash.
pub fn split_command(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(invalid("command", input)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc @ ('"' | '\\' | '$' | '`')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(invalid("command", input)),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(invalid("command", input)),
                    }
                }
            }
            '\\' => {
                in_word = true;
                current.push(chars.next().ok_or_else(|| invalid("command", input))?);
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn invalid(kind: &str, input: &str) -> ConvertError {
    ConvertError::Config {
        message: format!("invalid {kind}: \"{input}\""),
    }
}
