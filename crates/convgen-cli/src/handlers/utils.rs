//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use convgen_core::{Declaration, InMemoryCatalog};
use std::fs;
use std::path::Path;

/// Load a declaration document, choosing JSON or YAML by extension
pub fn load_declaration(path: &Path) -> Result<Declaration> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let _timer = Timer::with_details("load_declaration", &path.display().to_string());
    let content = fs::read_to_string(path)?;

    let declaration = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("json") => Declaration::from_json_str(&content)?,
        _ => {
            return Err(Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "JSON or YAML".to_string(),
            })
        }
    };

    tracing::debug!(
        path = %path.display(),
        interfaces = declaration.interfaces.len(),
        types = declaration.types.len(),
        "Declaration loaded"
    );
    Ok(declaration)
}

/// Interfaces to process: the requested ones in order without repeats, or
/// every declared interface when none were requested
pub fn select_interfaces(declaration: &Declaration, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        let all: Vec<String> = declaration
            .interface_names()
            .into_iter()
            .map(String::from)
            .collect();
        if all.is_empty() {
            return Err(Error::invalid_args("the declaration has no interfaces"));
        }
        return Ok(all);
    }

    let mut selected: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested.iter().map(|n| n.trim()) {
        if name.is_empty() {
            return Err(Error::invalid_args("empty interface name"));
        }
        if !selected.iter().any(|s| s == name) {
            selected.push(name.to_string());
        }
    }
    Ok(selected)
}

/// Build the catalog, the command-line prefix winning over configuration
pub fn build_catalog(
    declaration: Declaration,
    package_prefix: Option<&str>,
    config: &Config,
) -> Result<InMemoryCatalog> {
    let _timer = Timer::new("catalog_build");
    let prefix = package_prefix.or(config.generation.package_prefix.as_deref());
    Ok(declaration.into_catalog(prefix)?)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let json = write_declaration(dir.path(), "decl.json", DECLARATION);
        assert_eq!(
            load_declaration(&json).unwrap().interface_names(),
            vec!["UserMapper", "BatchMapper"]
        );

        let yaml = write_declaration(
            dir.path(),
            "decl.yaml",
            "package: main\ninterfaces:\n  - name: Mapper\n    methods: []\n",
        );
        assert_eq!(load_declaration(&yaml).unwrap().interface_names(), vec!["Mapper"]);
    }

    #[test]
    fn test_load_missing_declaration() {
        let err = load_declaration(Path::new("/nonexistent/decl.json")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_declaration(dir.path(), "decl.txt", DECLARATION);
        let err = load_declaration(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_malformed_yaml_is_a_yaml_error() {
        let dir = TempDir::new().unwrap();
        let path = write_declaration(dir.path(), "decl.yml", "interfaces: [unclosed");
        assert!(matches!(load_declaration(&path).unwrap_err(), Error::Yaml(_)));
    }

    #[test]
    fn test_select_interfaces() {
        let declaration = Declaration::from_json_str(DECLARATION).unwrap();

        assert_eq!(
            select_interfaces(&declaration, &[]).unwrap(),
            vec!["UserMapper", "BatchMapper"]
        );

        let requested = vec![
            "BatchMapper".to_string(),
            " UserMapper".to_string(),
            "BatchMapper".to_string(),
        ];
        assert_eq!(
            select_interfaces(&declaration, &requested).unwrap(),
            vec!["BatchMapper", "UserMapper"]
        );

        let err = select_interfaces(&declaration, &[" ".to_string()]).unwrap_err();
        assert!(err.should_show_help());
    }

    #[test]
    fn test_flag_prefix_beats_config_prefix() {
        let mut config = Config::default();
        config.generation.package_prefix = Some("from/config".to_string());

        let catalog = build_catalog(
            Declaration::from_json_str(DECLARATION).unwrap(),
            Some("github.com/acme/app"),
            &config,
        )
        .unwrap();
        let mapper = convgen_core::generate(&catalog, "UserMapper").unwrap();
        assert_eq!(mapper.units[0].name, "mapAppUserToAppUserDTO");

        let catalog = build_catalog(Declaration::from_json_str(DECLARATION).unwrap(), None, &config)
            .unwrap();
        let mapper = convgen_core::generate(&catalog, "UserMapper").unwrap();
        assert_eq!(mapper.units[0].name, "mapConfigUserToConfigUserDTO");
    }
}
