use crate::cli::StructureArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use molsurf::{
    core::{io::pdb::PdbBackboneReader, models::backbone::Chain},
    engine::config::StructureConfig,
    workflows,
};
use std::fmt::Write;
use tracing::{info, warn};

pub fn run(args: StructureArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    let config = partial_config.merge_structure_args(&args)?;

    info!("Loading backbone from {:?}", &args.input);
    let mut chains =
        PdbBackboneReader::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    if chains.is_empty() {
        warn!("No ATOM records with alpha carbons were found.");
    }

    print!("{}", assign_all(&mut chains, &config));
    Ok(())
}

/// Classifies every chain and lists its segments by residue number.
pub fn assign_all(chains: &mut [Chain], config: &StructureConfig) -> String {
    let mut report = String::new();
    for chain in chains.iter_mut() {
        let assignment = workflows::structure::assign(chain, config);
        let residues = chain.residues();
        let _ = writeln!(
            report,
            "Chain {}: {} residues, {} segments{}",
            chain.id,
            residues.len(),
            assignment.segments.len(),
            if assignment.hbonds.is_empty() {
                ""
            } else {
                " (hydrogen-bond refined)"
            }
        );
        for segment in &assignment.segments {
            let _ = writeln!(
                report,
                "  {:<6} {:>5} - {:<5}",
                segment.kind.to_string().to_uppercase(),
                residues[segment.start].id,
                residues[segment.end].id
            );
        }
    }
    report
}
