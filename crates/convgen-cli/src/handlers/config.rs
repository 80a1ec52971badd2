//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs, ConfigShowArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;

/// Handle the config command
pub fn handle_config(args: ConfigArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
    }
}

/// Handle config init subcommand
fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = args.path.unwrap_or_else(Config::project_config_path);

    if path.exists() && !args.force {
        return Err(Error::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save(&path)?;
    output.success(&format!("✓ Created config at {}", path.display()))?;
    output.info("Edit it to customize settings for this project.")
}

/// Handle config show subcommand
fn handle_config_show(
    args: ConfigShowArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let content = match args.format {
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| Error::config(format!("Failed to serialize as TOML: {}", e)))?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    output.writeln(content.trim_end())
}

#[cfg(test)]
mod tests {
    use super::super::utils::testing::writer;
    use super::*;
    use crate::cli::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".convgen.toml");
        let (mut output, _) = writer(OutputFormat::Human);

        let init = |force| ConfigInitArgs {
            path: Some(path.clone()),
            force,
        };

        handle_config_init(init(false), &mut output).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());

        std::fs::write(&path, "[output]\ncolor = false\n").unwrap();
        let err = handle_config_init(init(false), &mut output).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!Config::from_file(&path).unwrap().output.color);

        handle_config_init(init(true), &mut output).unwrap();
        assert!(Config::from_file(&path).unwrap().output.color);
    }

    #[test]
    fn test_show_formats() {
        let mut config = Config::default();
        config.generation.package_prefix = Some("github.com/acme/app".to_string());

        let (mut output, captured) = writer(OutputFormat::Human);
        handle_config_show(ConfigShowArgs { format: ConfigFormat::Toml }, &config, &mut output)
            .unwrap();
        let shown = captured.contents();
        assert!(shown.contains("[generation]"));
        assert!(shown.contains("package_prefix = \"github.com/acme/app\""));

        let (mut output, captured) = writer(OutputFormat::Human);
        handle_config_show(ConfigShowArgs { format: ConfigFormat::Json }, &config, &mut output)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&captured.contents()).unwrap();
        assert_eq!(value["output"]["format"], "human");
        assert_eq!(value["generation"]["file_suffix"], "_gen");
    }
}
