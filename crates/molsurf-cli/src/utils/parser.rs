use molsurf::core::models::volume::Plane;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected} comma-separated numbers in '{input}'.")]
    WrongCount { expected: usize, input: String },

    #[error("'{0}' is not a number.")]
    InvalidNumber(String),

    #[error("Plane '{0}' has a zero normal (a, b and c are all zero).")]
    DegeneratePlane(String),

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),
}

fn parse_numbers<const N: usize>(input: &str) -> Result<[f64; N], ParseError> {
    let tokens: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != N {
        return Err(ParseError::WrongCount {
            expected: N,
            input: input.to_string(),
        });
    }
    let mut numbers = [0.0; N];
    for (slot, token) in numbers.iter_mut().zip(tokens) {
        *slot = token
            .parse()
            .map_err(|_| ParseError::InvalidNumber(token.to_string()))?;
    }
    Ok(numbers)
}

/// Parses `a,b,c,d` into the plane `a*x + b*y + c*z + d = 0`.
pub fn parse_plane(input: &str) -> Result<Plane, ParseError> {
    let [a, b, c, d] = parse_numbers::<4>(input)?;
    Plane::from_coefficients(a, b, c, d).ok_or_else(|| ParseError::DegeneratePlane(input.to_string()))
}

/// Parses `red,blue` into the values mapped to the ends of the palette.
pub fn parse_range(input: &str) -> Result<(f32, f32), ParseError> {
    let [red, blue] = parse_numbers::<2>(input)?;
    Ok((red as f32, blue as f32))
}

/// Splits one `-S key=value` assignment.
pub fn parse_assignment(input: &str) -> Result<(&str, &str), ParseError> {
    input
        .split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| ParseError::InvalidAssignment(input.to_string()))
}
