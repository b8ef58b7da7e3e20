//! Parses the free-form `length_str` request field into a word-count
//! target (§9 resolved open question: "the exact `podcast_length_str`
//! grammar").
//!
//! Accepted forms, all case-insensitive:
//!   "5 minutes", "1 minute", "90 seconds", "10-12 minutes" (range: midpoint)
//!
//! Word rate is fixed at 150 words/minute (spec.md §4.3, §8 invariant 6).

use crate::error::Error;

const WORDS_PER_MINUTE: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthTarget {
    pub total_word_target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
}

/// Parse a `length_str` request field into a total word-count target.
///
/// Returns `Error::InputError` for anything that doesn't match the
/// accepted grammar — the caller surfaces this synchronously at the
/// `ControlSurface` (spec.md §7: InputError).
pub fn parse_length(input: &str) -> Result<LengthTarget, Error> {
    let normalized = input.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(Error::InputError("length_str must not be empty".into()));
    }

    let (number_part, unit) = split_unit(&normalized)?;

    let minutes = if let Some((lo, hi)) = number_part.split_once('-') {
        let lo: f64 = lo
            .trim()
            .parse()
            .map_err(|_| invalid(input))?;
        let hi: f64 = hi
            .trim()
            .parse()
            .map_err(|_| invalid(input))?;
        if lo <= 0.0 || hi <= 0.0 || hi < lo {
            return Err(invalid(input));
        }
        let midpoint = (lo + hi) / 2.0;
        to_minutes(midpoint, unit)
    } else {
        let value: f64 = number_part.trim().parse().map_err(|_| invalid(input))?;
        if value <= 0.0 {
            return Err(invalid(input));
        }
        to_minutes(value, unit)
    };

    let total_word_target = (minutes * WORDS_PER_MINUTE).round() as u32;
    if total_word_target == 0 {
        return Err(invalid(input));
    }

    Ok(LengthTarget { total_word_target })
}

fn to_minutes(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Minutes => value,
        Unit::Seconds => value / 60.0,
    }
}

fn split_unit(normalized: &str) -> Result<(&str, Unit), Error> {
    for (suffix, unit) in [
        ("minutes", Unit::Minutes),
        ("minute", Unit::Minutes),
        ("mins", Unit::Minutes),
        ("min", Unit::Minutes),
        ("seconds", Unit::Seconds),
        ("second", Unit::Seconds),
        ("secs", Unit::Seconds),
        ("sec", Unit::Seconds),
    ] {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            return Ok((stripped.trim(), unit));
        }
    }
    Err(invalid(normalized))
}

fn invalid(input: &str) -> Error {
    Error::InputError(format!("unparsable length_str: \"{input}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_minutes_yields_750_words() {
        let target = parse_length("5 minutes").unwrap();
        assert_eq!(target.total_word_target, 750);
    }

    #[test]
    fn singular_minute_form() {
        let target = parse_length("1 minute").unwrap();
        assert_eq!(target.total_word_target, 150);
    }

    #[test]
    fn ninety_seconds() {
        let target = parse_length("90 seconds").unwrap();
        assert_eq!(target.total_word_target, 225);
    }

    #[test]
    fn range_uses_midpoint() {
        // midpoint 11 minutes * 150 = 1650
        let target = parse_length("10-12 minutes").unwrap();
        assert_eq!(target.total_word_target, 1650);
    }

    #[test]
    fn case_insensitive_and_whitespace_tolerant() {
        let target = parse_length("  5 MINUTES  ").unwrap();
        assert_eq!(target.total_word_target, 750);
    }

    #[test]
    fn rejects_empty_string() {
        assert!(parse_length("").is_err());
    }

    #[test]
    fn rejects_missing_unit() {
        assert!(parse_length("5").is_err());
    }

    #[test]
    fn rejects_zero() {
        assert!(parse_length("0 minutes").is_err());
    }

    #[test]
    fn rejects_negative() {
        assert!(parse_length("-5 minutes").is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(parse_length("12-10 minutes").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_length("a long podcast please").is_err());
    }
}
