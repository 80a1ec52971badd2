//! Generate command handler

use super::utils::{build_catalog, load_declaration, select_interfaces};
use crate::cli::{GenerateArgs, OutputFormat};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use convgen_core::naming::output_stem;
use convgen_core::GeneratedMapper;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One report written to disk
#[derive(Debug, Serialize)]
struct WrittenReport {
    interface: String,
    path: PathBuf,
    units: usize,
    entry_points: usize,
}

/// Handle the generate command
///
/// Every interface is generated before the first file is written, so a
/// failing interface leaves the output directory untouched.
pub fn handle_generate(
    args: GenerateArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    output.info(&format!("Reading declaration: {}", args.declaration.display()))?;

    let declaration = load_declaration(&args.declaration)?;
    let interfaces = select_interfaces(&declaration, &args.interfaces)?;
    let targets = if args.dry_run {
        Vec::new()
    } else {
        report_paths(&args, config, &interfaces)?
    };
    let catalog = build_catalog(declaration, args.package_prefix.as_deref(), config)?;

    let mut mappers = Vec::with_capacity(interfaces.len());
    for name in &interfaces {
        let spinner = output.spinner(&format!("Generating {}", name));
        let timer = Timer::with_details("generate_interface", name);
        let result = convgen_core::generate(&catalog, name);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let mapper = result?;
        timer.finish();
        mappers.push(mapper);
    }

    if args.dry_run {
        return print_reports(&mappers, output);
    }

    let mut written = Vec::with_capacity(mappers.len());
    for (mapper, path) in mappers.iter().zip(targets) {
        write_report(&path, mapper)?;
        output.success(&format!(
            "✓ {} → {} ({} units, {} entry points)",
            mapper.interface.name,
            path.display(),
            mapper.metadata.unit_count,
            mapper.metadata.entry_point_count
        ))?;
        written.push(WrittenReport {
            interface: mapper.interface.to_string(),
            path,
            units: mapper.metadata.unit_count,
            entry_points: mapper.metadata.entry_point_count,
        });
    }

    if output.format() != OutputFormat::Human {
        output.data(&written)?;
    }
    Ok(())
}

/// Destination of each interface's report, in the same order
fn report_paths(
    args: &GenerateArgs,
    config: &Config,
    interfaces: &[String],
) -> Result<Vec<PathBuf>> {
    let file_name = |interface: &str| {
        let short = interface.rsplit('.').next().unwrap_or(interface);
        format!("{}.json", output_stem(short, &config.generation.file_suffix))
    };

    match &args.out {
        Some(out) if out.is_dir() => {
            Ok(interfaces.iter().map(|i| out.join(file_name(i))).collect())
        }
        Some(out) if interfaces.len() == 1 => Ok(vec![out.clone()]),
        Some(out) => Err(Error::invalid_args(format!(
            "--out {} must be an existing directory when generating {} interfaces",
            out.display(),
            interfaces.len()
        ))),
        None => {
            let dir = match &config.generation.output_dir {
                Some(dir) => dir.clone(),
                None => declaration_dir(&args.declaration),
            };
            Ok(interfaces.iter().map(|i| dir.join(file_name(i))).collect())
        }
    }
}

fn declaration_dir(declaration: &Path) -> PathBuf {
    match declaration.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_report(path: &Path, mapper: &GeneratedMapper) -> Result<()> {
    let mut content = serde_json::to_string_pretty(mapper)?;
    content.push('\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    tracing::info!(path = %path.display(), interface = %mapper.interface, "Report written");
    Ok(())
}

fn print_reports(mappers: &[GeneratedMapper], output: &mut OutputWriter) -> Result<()> {
    match (output.format(), mappers) {
        (OutputFormat::Human, _) => {
            for mapper in mappers {
                output.mapper(mapper, true)?;
            }
            Ok(())
        }
        (_, [single]) => output.data(single),
        (_, many) => output.data(&many),
    }
}

#[cfg(test)]
mod tests {
    use super::super::utils::testing::{write_declaration, writer, DECLARATION};
    use super::*;
    use tempfile::TempDir;

    fn args(declaration: PathBuf, interfaces: &[&str]) -> GenerateArgs {
        GenerateArgs {
            declaration,
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            out: None,
            dry_run: false,
            package_prefix: None,
        }
    }

    #[test]
    fn test_reports_land_next_to_declaration() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let (mut output, captured) = writer(OutputFormat::Human);

        handle_generate(args(declaration, &[]), &Config::default(), &mut output).unwrap();

        let user = dir.path().join("user_mapper_gen.json");
        let batch = dir.path().join("batch_mapper_gen.json");
        assert!(user.exists());
        assert!(batch.exists());

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&user).unwrap()).unwrap();
        assert_eq!(report["implementation"], "UserMapperImpl");
        assert_eq!(report["units"][0]["name"], "mapMainUserToMainUserDTO");

        assert!(captured.contents().contains("user_mapper_gen.json"));
    }

    #[test]
    fn test_out_file_for_single_interface() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let out = dir.path().join("custom.json");
        let (mut output, _) = writer(OutputFormat::Human);

        let mut generate = args(declaration, &["UserMapper"]);
        generate.out = Some(out.clone());
        handle_generate(generate, &Config::default(), &mut output).unwrap();

        assert!(out.exists());
        assert!(!dir.path().join("user_mapper_gen.json").exists());
    }

    #[test]
    fn test_out_must_be_directory_for_several_interfaces() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let (mut output, _) = writer(OutputFormat::Human);

        let mut generate = args(declaration, &["UserMapper", "BatchMapper"]);
        generate.out = Some(dir.path().join("one.json"));
        let err = handle_generate(generate, &Config::default(), &mut output).unwrap_err();

        assert!(matches!(err, Error::InvalidArgs(_)));
        assert!(!dir.path().join("one.json").exists());
    }

    #[test]
    fn test_configured_output_dir_and_suffix() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let mut config = Config::default();
        config.generation.output_dir = Some(dir.path().join("generated"));
        config.generation.file_suffix = "_mapping".to_string();
        let (mut output, _) = writer(OutputFormat::Human);

        handle_generate(args(declaration, &["BatchMapper"]), &config, &mut output).unwrap();

        assert!(dir.path().join("generated").join("batch_mapper_mapping.json").exists());
    }

    #[test]
    fn test_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let (mut output, _) = writer(OutputFormat::Human);

        let err = handle_generate(
            args(declaration, &["UserMapper", "Missing"]),
            &Config::default(),
            &mut output,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Core(_)));
        assert!(!dir.path().join("user_mapper_gen.json").exists());
    }

    #[test]
    fn test_dry_run_prints_json_report() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let (mut output, captured) = writer(OutputFormat::Json);

        let mut generate = args(declaration, &["UserMapper"]);
        generate.dry_run = true;
        handle_generate(generate, &Config::default(), &mut output).unwrap();

        let printed: serde_json::Value = serde_json::from_str(captured.contents().trim()).unwrap();
        assert_eq!(printed["constructor"], "NewUserMapperImpl");
        assert!(!dir.path().join("user_mapper_gen.json").exists());
    }

    #[test]
    fn test_machine_format_lists_written_reports() {
        let dir = TempDir::new().unwrap();
        let declaration = write_declaration(dir.path(), "mappers.json", DECLARATION);
        let (mut output, captured) = writer(OutputFormat::Json);

        handle_generate(args(declaration, &[]), &Config::default(), &mut output).unwrap();

        let printed: serde_json::Value = serde_json::from_str(captured.contents().trim()).unwrap();
        assert_eq!(printed.as_array().unwrap().len(), 2);
        assert_eq!(printed[0]["interface"], "main.UserMapper");
        assert_eq!(printed[1]["entry_points"], 1);
    }
}
