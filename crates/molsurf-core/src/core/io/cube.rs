use super::traits::{
    BOHR_TO_ANGSTROM, LengthUnit, LineCursor, VolumeFileError, VolumeHeader, VolumetricSource,
    parse_token,
};
use crate::core::models::volume::VolumeData;
use nalgebra::{Point3, Vector3};
use tracing::debug;

/// Reads the CUBE-style preamble shared by Gaussian CUBE and JVXL files: two title lines, the
/// atom-count/origin line, three count/vector lines and the atom list.
pub(crate) fn read_cube_header(cursor: &mut LineCursor) -> Result<VolumeHeader, VolumeFileError> {
    let titles = vec![
        cursor.expect_line("title line")?.trim_end().to_string(),
        cursor.expect_line("title line")?.trim_end().to_string(),
    ];

    let atom_line = cursor.expect_line("atom count and origin")?;
    let atom_count: i64 = parse_token(cursor, &atom_line, 0, "atom count")?;
    let mut origin = Point3::new(
        parse_token(cursor, &atom_line, 1, "origin x")?,
        parse_token(cursor, &atom_line, 2, "origin y")?,
        parse_token(cursor, &atom_line, 3, "origin z")?,
    );
    let mut units = if atom_line.contains("ANGSTROMS") {
        LengthUnit::Angstrom
    } else {
        LengthUnit::Bohr
    };

    let mut counts = [0usize; 3];
    let mut vectors = [Vector3::zeros(); 3];
    for axis in 0..3 {
        let line = cursor.expect_line("voxel count and vector")?;
        let count: i64 = parse_token(cursor, &line, 0, "voxel count")?;
        if count < 0 {
            units = LengthUnit::Angstrom;
        }
        counts[axis] = count.unsigned_abs() as usize;
        vectors[axis] = Vector3::new(
            parse_token(cursor, &line, 1, "voxel vector x")?,
            parse_token(cursor, &line, 2, "voxel vector y")?,
            parse_token(cursor, &line, 3, "voxel vector z")?,
        );
    }

    if units == LengthUnit::Bohr {
        origin.coords *= BOHR_TO_ANGSTROM;
        for vector in &mut vectors {
            *vector *= BOHR_TO_ANGSTROM;
        }
    }

    for _ in 0..atom_count.unsigned_abs() {
        cursor.expect_line("atom record")?;
    }

    debug!(
        "Read volume header: {}x{}x{} points, {} atoms, {}",
        counts[0], counts[1], counts[2], atom_count, units
    );

    Ok(VolumeHeader {
        titles,
        atom_count,
        origin,
        vectors,
        counts,
        units,
    })
}

/// Gaussian CUBE reader. A negative atom count marks an orbital cube whose extra line lists
/// the stored orbitals; only the first orbital is kept.
pub struct CubeReader {
    cursor: LineCursor,
    orbital_count: usize,
}

impl VolumetricSource for CubeReader {
    type Payload = VolumeData;
    type Error = VolumeFileError;

    fn from_text(text: &str) -> Self {
        Self {
            cursor: LineCursor::new(text),
            orbital_count: 1,
        }
    }

    fn read_header(&mut self) -> Result<VolumeHeader, Self::Error> {
        read_cube_header(&mut self.cursor)
    }

    fn read_extra_line(&mut self, header: &VolumeHeader) -> Result<(), Self::Error> {
        if header.atom_count < 0 {
            let line = self.cursor.expect_line("orbital list")?;
            let orbitals: usize = parse_token(&self.cursor, &line, 0, "orbital count")?;
            self.orbital_count = orbitals.max(1);
        }
        Ok(())
    }

    fn read_voxel_data(&mut self, header: &VolumeHeader) -> Result<Self::Payload, Self::Error> {
        let stride = self.orbital_count;
        let raw = self
            .cursor
            .read_floats(header.point_count() * stride, "voxel data")?;
        let values = if stride == 1 {
            raw
        } else {
            raw.into_iter().step_by(stride).collect()
        };
        Ok(VolumeData::new(
            header.origin,
            header.vectors,
            header.counts,
            values,
        )?)
    }
}
