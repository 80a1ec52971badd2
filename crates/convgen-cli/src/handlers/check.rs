//! Check command handler

use super::utils::{build_catalog, load_declaration, select_interfaces};
use crate::cli::{CheckArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::{CheckSummary, OutputWriter};

/// Handle the check command
///
/// Runs both generation passes for every selected interface and reports
/// what would be generated. Nothing is written.
pub fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    output.info(&format!("Checking declaration: {}", args.declaration.display()))?;

    let declaration = load_declaration(&args.declaration)?;
    let interfaces = select_interfaces(&declaration, &args.interfaces)?;
    let catalog = build_catalog(declaration, args.package_prefix.as_deref(), config)?;

    let mut summaries = Vec::with_capacity(interfaces.len());
    for name in &interfaces {
        let _timer = Timer::with_details("check_interface", name);
        let mapper = convgen_core::generate(&catalog, name)?;
        if output.is_verbose() && output.format() == OutputFormat::Human {
            output.mapper(&mapper, false)?;
        }
        summaries.push(CheckSummary::from_mapper(&mapper));
    }

    if output.format() != OutputFormat::Human {
        return output.data(&summaries);
    }

    output.section("Check")?;
    output.table(
        &["Interface", "Implementation", "Units", "Entry points", "Transforms", "Fallible"],
        summaries
            .iter()
            .map(|s| {
                vec![
                    s.interface.clone(),
                    s.implementation.clone(),
                    s.units.to_string(),
                    s.entry_points.to_string(),
                    s.transforms.to_string(),
                    s.fallible_signatures.len().to_string(),
                ]
            })
            .collect(),
    )?;

    for summary in &summaries {
        for fallible in &summary.fallible_signatures {
            let message = match &fallible.culprit {
                Some(culprit) => format!("{} can fail at {}", fallible.signature, culprit),
                None => format!("{} can fail", fallible.signature),
            };
            output.info(&message)?;
        }
    }

    output.success(&format!(
        "✓ {} interface(s) generate cleanly",
        summaries.len()
    ))
}
