use crate::core::models::backbone::{BackboneAtoms, Chain, Residue};
use nalgebra::Point3;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

#[derive(Default)]
struct PendingResidue {
    id: isize,
    name: String,
    atoms: HashMap<String, Point3<f64>>,
}

impl PendingResidue {
    fn finish(self) -> Option<Residue> {
        let ca = *self.atoms.get("CA")?;
        let residue = Residue::new(self.id, &self.name, ca);
        match (
            self.atoms.get("N"),
            self.atoms.get("C"),
            self.atoms.get("O"),
        ) {
            (Some(&n), Some(&c), Some(&o)) => Some(residue.with_backbone(BackboneAtoms { n, c, o })),
            _ => Some(residue),
        }
    }
}

/// Reads protein backbones from the ATOM records of a PDB file.
///
/// Only the first model is read. Residues without an alpha carbon are skipped; residues missing
/// any of N, C or O keep their alpha carbon but carry no backbone atoms.
pub struct PdbBackboneReader;

impl PdbBackboneReader {
    pub fn read_from(reader: &mut impl BufRead) -> Result<Vec<Chain>, PdbError> {
        let mut chains: Vec<Chain> = Vec::new();
        let mut pending: Option<(char, String, PendingResidue)> = None;

        let flush = |chains: &mut Vec<Chain>, chain_id: char, residue: PendingResidue| {
            let id = residue.id;
            match residue.finish() {
                Some(residue) => {
                    if chains.last().is_none_or(|c| c.id != chain_id) {
                        chains.push(Chain::new(chain_id));
                    }
                    if let Some(chain) = chains.last_mut() {
                        chain.push(residue);
                    }
                }
                None => warn!("Residue {} of chain {} has no CA atom; skipped", id, chain_id),
            }
        };

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            let record_type = slice_and_trim(&line, 0, 6);
            if record_type == "ENDMDL" {
                break;
            }
            if record_type != "ATOM" {
                continue;
            }
            if line.len() < 54 {
                return Err(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::LineTooShort,
                });
            }

            let atom_name = slice_and_trim(&line, 12, 16);
            let alt_loc = slice_and_trim(&line, 16, 17);
            if !alt_loc.is_empty() && alt_loc != "A" {
                continue;
            }
            let res_name = slice_and_trim(&line, 17, 20);
            let chain_id = slice_and_trim(&line, 21, 22).chars().next().unwrap_or('A');
            let res_seq_str = slice_and_trim(&line, 22, 26);
            let insertion = slice_and_trim(&line, 26, 27);

            let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidInt {
                    columns: "23-26".into(),
                    value: res_seq_str.into(),
                },
            })?;

            let mut coords = [0.0f64; 3];
            for (axis, (start, end, columns)) in
                [(30, 38, "31-38"), (38, 46, "39-46"), (46, 54, "47-54")]
                    .into_iter()
                    .enumerate()
            {
                let text = slice_and_trim(&line, start, end);
                coords[axis] = text.parse().map_err(|_| PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::InvalidFloat {
                        columns: columns.into(),
                        value: text.into(),
                    },
                })?;
            }

            let key = format!("{res_seq}{insertion}");
            let is_new_residue = pending
                .as_ref()
                .is_none_or(|(c, k, _)| *c != chain_id || *k != key);
            if is_new_residue {
                if let Some((c, _, residue)) = pending.take() {
                    flush(&mut chains, c, residue);
                }
                pending = Some((
                    chain_id,
                    key,
                    PendingResidue {
                        id: res_seq,
                        name: res_name.to_string(),
                        atoms: HashMap::new(),
                    },
                ));
            }
            if let Some((_, _, residue)) = pending.as_mut() {
                residue
                    .atoms
                    .entry(atom_name.to_string())
                    .or_insert(Point3::from(coords));
            }
        }
        if let Some((c, _, residue)) = pending.take() {
            flush(&mut chains, c, residue);
        }

        debug!(
            "Read {} chains with {} residues",
            chains.len(),
            chains.iter().map(|c| c.residues().len()).sum::<usize>()
        );
        Ok(chains)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Chain>, PdbError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}
