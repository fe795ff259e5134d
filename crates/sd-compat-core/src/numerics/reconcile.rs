//! Decimal-precision reconciliation of textual values.
//!
//! Simulators print the same quantity at different precisions (`1.50` vs
//! `1.5000000`). Before the tolerance check, both values are rounded to the
//! shorter of the two printed precisions.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{text}' is not a valid number")]
pub struct ValueParseError {
    pub text: String,
}

pub fn parse_value(text: &str) -> Result<f64, ValueParseError> {
    text.trim().parse::<f64>().map_err(|_| ValueParseError {
        text: text.to_string(),
    })
}

/// Number of digits printed after the decimal point of a plain decimal.
///
/// `None` when the text has no decimal point or uses exponent notation; the
/// mantissa digits of `1.25e-3` say nothing about its decimal places.
pub fn fraction_digits(text: &str) -> Option<usize> {
    let (_, fraction) = text.split_once('.')?;
    if fraction.contains(['e', 'E']) {
        return None;
    }
    Some(
        fraction
            .chars()
            .take_while(|character| character.is_ascii_digit())
            .count(),
    )
}

/// Rounds to `decimals` places using the exact decimal expansion of `value`.
pub fn round_to_decimals(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Parses both values and, when they differ and were printed at different
/// precisions, rounds both to the smaller precision.
pub fn reconcile_precision(
    reference: &str,
    simulated: &str,
) -> Result<(f64, f64), ValueParseError> {
    let reference_value = parse_value(reference)?;
    let simulated_value = parse_value(simulated)?;
    if reference_value == simulated_value {
        return Ok((reference_value, simulated_value));
    }

    let reference = reference.trim();
    let simulated = simulated.trim();
    match (fraction_digits(reference), fraction_digits(simulated)) {
        (Some(reference_digits), Some(simulated_digits)) if reference.len() != simulated.len() => {
            let decimals = reference_digits.min(simulated_digits);
            Ok((
                round_to_decimals(reference_value, decimals),
                round_to_decimals(simulated_value, decimals),
            ))
        }
        _ => Ok((reference_value, simulated_value)),
    }
}
