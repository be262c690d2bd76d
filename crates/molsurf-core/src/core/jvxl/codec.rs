use super::error::JvxlError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE: u32 = 35;
pub const DEFAULT_RANGE: u32 = 90;

const BACKSLASH: u32 = 92;
const BACKSLASH_SUBSTITUTE: u32 = 33;
const MIN_BASE: u32 = 35;
const MAX_CODE: u32 = 125;
const RUN_MARKER: char = '~';
const MIN_COMPRESSED_RUN: usize = 4;

/// Maps fractions in `[0, 1]` onto a contiguous printable alphabet `[base, base + range]`.
///
/// The top code `base + range` is reserved for NaN, so valid fractions use at most
/// `base + range - 1`. A backslash is written as `!` so the stream never contains an escape
/// character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionEncoding {
    base: u32,
    range: u32,
}

impl Default for FractionEncoding {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            range: DEFAULT_RANGE,
        }
    }
}

impl FractionEncoding {
    /// `base` must leave room below it for `!` and `"`, and the NaN sentinel must stay
    /// below `~`, the compressor's run marker.
    pub fn new(base: u32, range: u32) -> Result<Self, JvxlError> {
        if base < MIN_BASE || range < 2 || base + range > MAX_CODE {
            return Err(JvxlError::InvalidEncoding { base, range });
        }
        Ok(Self { base, range })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    /// The character written for a NaN fraction.
    pub fn nan_character(&self) -> char {
        Self::to_char(self.base + self.range)
    }

    fn to_char(code: u32) -> char {
        let code = if code == BACKSLASH {
            BACKSLASH_SUBSTITUTE
        } else {
            code
        };
        char::from_u32(code).unwrap_or('#')
    }

    fn code_of(&self, character: char, position: usize) -> Result<u32, JvxlError> {
        let code = match character as u32 {
            BACKSLASH_SUBSTITUTE => BACKSLASH,
            code => code,
        };
        if code < self.base || code > self.base + self.range {
            return Err(JvxlError::InvalidCharacter {
                character,
                position,
            });
        }
        Ok(code - self.base)
    }

    pub fn encode(&self, fraction: f32) -> char {
        if fraction.is_nan() {
            return self.nan_character();
        }
        let step = (fraction.clamp(0.0, 1.0) * self.range as f32).round() as u32;
        Self::to_char(self.base + step.min(self.range - 1))
    }

    /// Inverse of [`encode`](Self::encode); `position` is only used for error reporting.
    pub fn decode(&self, character: char, position: usize) -> Result<f32, JvxlError> {
        let step = self.code_of(character, position)?;
        if step == self.range {
            Ok(f32::NAN)
        } else {
            Ok(step as f32 / self.range as f32)
        }
    }

    /// Two-character encoding: a coarse step and the remainder within that step, each at the
    /// same resolution.
    pub fn encode_precise(&self, fraction: f32) -> (char, char) {
        if fraction.is_nan() {
            let nan = self.nan_character();
            return (nan, nan);
        }
        let range = self.range as f32;
        let scaled = fraction.clamp(0.0, 1.0) * range;
        let coarse = (scaled.floor() as u32).min(self.range - 1);
        let remainder = scaled - coarse as f32;
        let fine = ((remainder * range).round() as u32).min(self.range - 1);
        (
            Self::to_char(self.base + coarse),
            Self::to_char(self.base + fine),
        )
    }

    pub fn decode_precise(
        &self,
        coarse: char,
        fine: char,
        position: usize,
    ) -> Result<f32, JvxlError> {
        let c1 = self.code_of(coarse, position)?;
        let c2 = self.code_of(fine, position)?;
        if c1 == self.range || c2 == self.range {
            return Ok(f32::NAN);
        }
        let range = self.range as f32;
        Ok((c1 as f32 + c2 as f32 / range) / range)
    }

    pub fn encode_all(&self, fractions: &[f32]) -> String {
        fractions.iter().map(|&f| self.encode(f)).collect()
    }

    pub fn decode_all(&self, data: &str) -> Result<Vec<f32>, JvxlError> {
        data.chars()
            .enumerate()
            .map(|(position, c)| self.decode(c, position))
            .collect()
    }

    /// Writes all coarse characters, then all fine characters, so character `i` and
    /// character `i + n` together describe value `i`.
    pub fn encode_all_precise(&self, fractions: &[f32]) -> String {
        let (coarse, fine): (String, String) =
            fractions.iter().map(|&f| self.encode_precise(f)).unzip();
        coarse + &fine
    }

    pub fn decode_all_precise(&self, data: &str) -> Result<Vec<f32>, JvxlError> {
        let chars: Vec<char> = data.chars().collect();
        if chars.len() % 2 != 0 {
            return Err(JvxlError::ColorCountMismatch {
                expected: chars.len() + 1,
                actual: chars.len(),
            });
        }
        let n = chars.len() / 2;
        (0..n)
            .map(|i| self.decode_precise(chars[i], chars[i + n], i))
            .collect()
    }
}

/// Replaces each run of four or more identical characters by `c~k ` where `k` is the number
/// of additional copies. Whitespace is never compressed and a literal `~` becomes `~~`.
pub fn compress(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut chars = data.chars().peekable();
    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        if c == RUN_MARKER {
            for _ in 0..run {
                out.push_str("~~");
            }
        } else if c.is_whitespace() || run < MIN_COMPRESSED_RUN {
            out.extend(std::iter::repeat_n(c, run));
        } else {
            out.push(c);
            out.push(RUN_MARKER);
            out.push_str(&(run - 1).to_string());
            out.push(' ');
        }
    }
    out
}

/// Inverse of [`compress`]. A `~` followed by neither `~` nor a digit is kept literally, the
/// way older writers emitted it.
pub fn decompress(data: &str) -> Result<String, JvxlError> {
    let mut out = String::with_capacity(data.len() * 2);
    let mut last: Option<char> = None;
    let mut chars = data.char_indices().peekable();
    while let Some((position, c)) = chars.next() {
        if c != RUN_MARKER {
            out.push(c);
            last = Some(c);
            continue;
        }
        match chars.peek().map(|&(_, next)| next) {
            Some(RUN_MARKER) => {
                chars.next();
                out.push(RUN_MARKER);
                last = Some(RUN_MARKER);
            }
            Some(d) if d.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let count: usize = digits.parse().map_err(|_| JvxlError::Decompression {
                    position,
                    reason: format!("repeat count '{digits}' is too large"),
                })?;
                let repeated = last.ok_or_else(|| JvxlError::Decompression {
                    position,
                    reason: "repeat count with no preceding character".to_string(),
                })?;
                out.extend(std::iter::repeat_n(repeated, count));
                if chars.peek().map(|&(_, c)| c) == Some(' ') {
                    chars.next();
                }
            }
            _ => {
                out.push(RUN_MARKER);
                last = Some(RUN_MARKER);
            }
        }
    }
    Ok(out)
}
