//! The GM override dice notation (spec.md §6.2).
//!
//! Two forms are accepted: an explicit value list `[v1,v2,...]`, which feeds
//! [`crate::roll::reclassify`] directly, and the minimal `NdM`/`NdM+K`/`NdM-K`
//! notation, which names a dice count for the engine to roll itself. Per
//! spec.md, `M` is always `6` (the game has no other die size); `N` and the
//! post-modifier dice count must land in `1..=6`.

use crate::error::DiceError;

/// A parsed GM override (spec.md §6.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideSpec {
    /// Explicit die values the engine should classify as-is.
    ExplicitValues(Vec<u8>),
    /// A dice count the engine should roll itself before classifying.
    DiceCount(u8),
}

/// Parse a GM `override <dice-spec>` payload.
pub fn parse_override(raw: &str) -> Result<OverrideSpec, DiceError> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return parse_explicit_values(inner, trimmed);
    }
    parse_ndm(trimmed)
}

fn parse_explicit_values(inner: &str, original: &str) -> Result<OverrideSpec, DiceError> {
    if inner.trim().is_empty() {
        return Err(DiceError::InvalidOverrideNotation(original.to_string()));
    }
    let mut values = Vec::new();
    for part in inner.split(',') {
        let value: u8 = part
            .trim()
            .parse()
            .map_err(|_| DiceError::InvalidOverrideNotation(original.to_string()))?;
        if !(1..=6).contains(&value) {
            return Err(DiceError::InvalidDieValue(value));
        }
        values.push(value);
    }
    if values.len() > 6 {
        return Err(DiceError::InvalidOverrideNotation(original.to_string()));
    }
    Ok(OverrideSpec::ExplicitValues(values))
}

fn parse_ndm(raw: &str) -> Result<OverrideSpec, DiceError> {
    let Some(d_index) = raw.find(['d', 'D']) else {
        return Err(DiceError::InvalidOverrideNotation(raw.to_string()));
    };
    let (n_part, rest) = raw.split_at(d_index);
    let rest = &rest[1..];

    let n: u8 = n_part
        .parse()
        .map_err(|_| DiceError::InvalidOverrideNotation(raw.to_string()))?;

    let (m_part, modifier) = split_modifier(rest);
    let m: u8 = m_part
        .parse()
        .map_err(|_| DiceError::InvalidOverrideNotation(raw.to_string()))?;
    if m != 6 {
        return Err(DiceError::InvalidOverrideNotation(raw.to_string()));
    }

    let modifier_value = match modifier {
        None => 0_i16,
        Some((sign, digits)) => {
            let magnitude: i16 = digits
                .parse()
                .map_err(|_| DiceError::InvalidOverrideNotation(raw.to_string()))?;
            if !(0..=5).contains(&magnitude) {
                return Err(DiceError::InvalidOverrideNotation(raw.to_string()));
            }
            if sign == '-' { -magnitude } else { magnitude }
        }
    };

    if !(1..=6).contains(&n) {
        return Err(DiceError::InvalidDiceCount(n));
    }
    let adjusted = i16::from(n) + modifier_value;
    if !(1..=6).contains(&adjusted) {
        return Err(DiceError::InvalidOverrideNotation(raw.to_string()));
    }
    Ok(OverrideSpec::DiceCount(adjusted as u8))
}

/// Split a trailing `+K`/`-K` modifier off of `rest`, if present.
fn split_modifier(rest: &str) -> (&str, Option<(char, &str)>) {
    if let Some(plus_index) = rest.find('+') {
        let (m, k) = rest.split_at(plus_index);
        return (m, Some(('+', &k[1..])));
    }
    if let Some(minus_index) = rest.find('-') {
        let (m, k) = rest.split_at(minus_index);
        return (m, Some(('-', &k[1..])));
    }
    (rest, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_ndm() {
        assert_eq!(parse_override("3d6").expect("valid"), OverrideSpec::DiceCount(3));
    }

    #[test]
    fn parses_ndm_with_positive_modifier() {
        assert_eq!(
            parse_override("2d6+2").expect("valid"),
            OverrideSpec::DiceCount(4)
        );
    }

    #[test]
    fn parses_ndm_with_negative_modifier() {
        assert_eq!(
            parse_override("4d6-2").expect("valid"),
            OverrideSpec::DiceCount(2)
        );
    }

    #[test]
    fn rejects_non_d6_sides() {
        assert!(parse_override("3d8").is_err());
    }

    #[test]
    fn parses_explicit_value_list() {
        assert_eq!(
            parse_override("[1,2,6]").expect("valid"),
            OverrideSpec::ExplicitValues(vec![1, 2, 6])
        );
    }

    #[test]
    fn rejects_explicit_value_out_of_range() {
        assert!(parse_override("[1,7]").is_err());
    }

    #[test]
    fn rejects_modifier_pushing_count_out_of_range() {
        assert!(parse_override("1d6-1").is_err());
        assert!(parse_override("6d6+1").is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(parse_override("not a dice spec").is_err());
    }
}
