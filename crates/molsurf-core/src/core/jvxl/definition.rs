use super::error::JvxlError;
use crate::core::models::volume::Plane;
use std::fmt;
use std::str::FromStr;

/// The per-surface definition line:
/// `cutoff param1 param2 param3 valueMappedToRed valueMappedToBlue [a b c d]`.
///
/// The three integers pack the surface mode:
///
/// | param1 | param2 | param3 | meaning |
/// |---|---|---|---|
/// | -1 | -1 | * | plane, not contoured |
/// | -1 | -2 | * | plane, contourable, precision color |
/// | -1-nInts | >=0 | * | contoured volumetric surface |
/// | nInts | -colorCount | * | bicolor map |
/// | nInts | edgeCount | colorBytes | plain surface; negative colorBytes means precision |
///
/// Plane coefficients follow only when `param1 == -1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefinitionLine {
    pub cutoff: f32,
    pub param1: i32,
    pub param2: i32,
    pub param3: i32,
    pub value_red: f32,
    pub value_blue: f32,
    pub plane: Option<Plane>,
}

fn signed_color_bytes(color_bytes: usize, precision: bool) -> i32 {
    let bytes = color_bytes as i32;
    if precision { -bytes } else { bytes }
}

impl DefinitionLine {
    /// A colored (or uncolored) slice through the data. Contourable planes always carry
    /// precision color.
    pub fn plane(
        cutoff: f32,
        plane: Plane,
        color_bytes: usize,
        contourable: bool,
        precision: bool,
        range: (f32, f32),
    ) -> Self {
        let precise = contourable || precision;
        Self {
            cutoff,
            param1: -1,
            param2: if contourable { -2 } else { -1 },
            param3: signed_color_bytes(color_bytes, precise && color_bytes > 0),
            value_red: range.0,
            value_blue: range.1,
            plane: Some(plane),
        }
    }

    pub fn contoured(
        cutoff: f32,
        surface_ints: usize,
        edge_count: usize,
        color_bytes: usize,
        precision: bool,
        range: (f32, f32),
    ) -> Self {
        Self {
            cutoff,
            param1: -1 - surface_ints as i32,
            param2: edge_count as i32,
            param3: signed_color_bytes(color_bytes, precision),
            value_red: range.0,
            value_blue: range.1,
            plane: None,
        }
    }

    pub fn bicolor(
        cutoff: f32,
        surface_ints: usize,
        color_count: usize,
        color_bytes: usize,
        precision: bool,
    ) -> Self {
        Self {
            cutoff,
            param1: surface_ints as i32,
            param2: -(color_count as i32),
            param3: signed_color_bytes(color_bytes, precision),
            value_red: -1.0,
            value_blue: 1.0,
            plane: None,
        }
    }

    pub fn plain(
        cutoff: f32,
        surface_ints: usize,
        edge_count: usize,
        color_bytes: usize,
        precision: bool,
        range: (f32, f32),
    ) -> Self {
        Self {
            cutoff,
            param1: surface_ints as i32,
            param2: edge_count as i32,
            param3: signed_color_bytes(color_bytes, precision),
            value_red: range.0,
            value_blue: range.1,
            plane: None,
        }
    }

    pub fn is_plane(&self) -> bool {
        self.param1 == -1
    }

    pub fn is_contoured(&self) -> bool {
        self.param1 < 0 && self.param2 != -1
    }

    pub fn is_bicolor(&self) -> bool {
        self.param1 > 0 && self.param2 < 0
    }

    pub fn is_color_mapped(&self) -> bool {
        self.param3 != 0
    }

    pub fn is_precision_color(&self) -> bool {
        (self.param1 == -1 && self.param2 == -2) || self.param3 < 0
    }

    /// Number of run-length integers stored for this surface.
    pub fn surface_int_count(&self) -> usize {
        match self.param1 {
            p if p < -1 => (-1 - p) as usize,
            p if p > 0 => p as usize,
            _ => 0,
        }
    }

    /// Number of color characters that follow the edge data.
    pub fn color_byte_count(&self) -> usize {
        self.param3.unsigned_abs() as usize
    }
}

impl fmt::Display for DefinitionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.cutoff, self.param1, self.param2, self.param3, self.value_red, self.value_blue
        )?;
        if let Some(plane) = &self.plane {
            let [a, b, c, d] = plane.coefficients();
            write!(f, " {a} {b} {c} {d}")?;
        }
        Ok(())
    }
}

impl FromStr for DefinitionLine {
    type Err = JvxlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| JvxlError::Definition {
            line: line.to_string(),
            reason: reason.to_string(),
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            return Err(fail("expected cutoff and three integer parameters"));
        }
        let float = |i: usize, name: &str| -> Result<f32, JvxlError> {
            tokens
                .get(i)
                .ok_or_else(|| fail(&format!("missing {name}")))?
                .parse()
                .map_err(|_| fail(&format!("invalid {name}")))
        };
        let int = |i: usize| -> Result<i32, JvxlError> {
            tokens[i]
                .parse()
                .map_err(|_| fail(&format!("invalid parameter {i}")))
        };

        let cutoff = float(0, "cutoff")?;
        let (param1, param2, param3) = (int(1)?, int(2)?, int(3)?);
        let (value_red, value_blue) = if tokens.len() >= 6 {
            (float(4, "red value")?, float(5, "blue value")?)
        } else if param3 != 0 {
            return Err(fail("color-mapped surface needs its mapping range"));
        } else {
            (0.0, 0.0)
        };

        let plane = if param1 == -1 {
            let coefficient = |i: usize| -> Result<f64, JvxlError> {
                tokens
                    .get(i)
                    .ok_or_else(|| fail("plane surface needs four plane coefficients"))?
                    .parse()
                    .map_err(|_| fail("invalid plane coefficient"))
            };
            let plane = Plane::from_coefficients(
                coefficient(6)?,
                coefficient(7)?,
                coefficient(8)?,
                coefficient(9)?,
            )
            .ok_or_else(|| fail("plane normal is zero"))?;
            Some(plane)
        } else {
            None
        };

        Ok(Self {
            cutoff,
            param1,
            param2,
            param3,
            value_red,
            value_blue,
            plane,
        })
    }
}
