use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::PipelineConfig;
use crate::errors::{ArtifactKind, Error, Result};
use crate::io;

/// Location `init` writes to and the commands read from by default.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

pub const DEFAULT_CONFIG_YAML: &str = r#"# deployrisk configuration

paths:
  data: data/synthetic_release_log.csv
  model: models/release_risk_model.bin
  predictions: data/predictions.csv
  metrics: data/metrics.json
  importance_plot: data/feature_importance.svg

target: deploy_failed
seed: 42
test_size: 0.2

model:
  # linear | boosted-tree | alt-boosted-tree
  type: boosted-tree
  params:
    n_estimators: 100
    learning_rate: 0.1
    max_depth: 3

insights:
  n_repeats: 5
  plot_top: 15
"#;

/// Parse and validate a configuration document.
pub fn parse_config(contents: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        serde_yaml::from_str(contents).map_err(|e| Error::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::not_found(ArtifactKind::Config, path),
        _ => Error::Io(e),
    })?;

    let config = parse_config(&contents).map_err(|e| match e {
        Error::Configuration { key, message } => Error::Configuration {
            key,
            message: format!("{message} (in {})", path.display()),
        },
        other => other,
    })?;

    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Write the default configuration, refusing to clobber an existing file
/// unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    io::write_file(path, DEFAULT_CONFIG_YAML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_named() {
        let yaml = indoc! {"
            paths:
              data: d.csv
              model: m.bin
              predictions: p.csv
              metrics: m.json
              importance_plot: i.svg
            target: deploy_failed
            test_size: 0.2
            model:
              type: linear
        "};
        let err = parse_config(yaml).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("seed"), "{err}");
    }

    #[test]
    fn test_unknown_model_type_is_configuration_error() {
        let yaml = DEFAULT_CONFIG_YAML.replace("type: boosted-tree", "type: random-forest");
        let err = parse_config(&yaml).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_params_are_kept_verbatim() {
        let config = parse_config(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(
            config.model.params.get("max_depth").and_then(|v| v.as_u64()),
            Some(3)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(
            err,
            Error::ArtifactNotFound {
                kind: ArtifactKind::Config,
                ..
            }
        ));
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configs").join("config.yaml");
        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();
        assert!(load_config(&path).is_ok());
    }
}
