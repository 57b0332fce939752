//! Error types for blueprint-core.

use std::path::PathBuf;

use thiserror::Error;

/// A pipeline that must never reach the CD engine.
///
/// Raised while the pipeline is being built, before any cloud resource is
/// touched. Every variant names the offending field or stage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required field was empty or blank.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// Two teams share a name and therefore a namespace.
    #[error("namespace collision: team '{team}' is registered more than once")]
    NamespaceCollision { team: String },

    /// Two stages resolve to the same cluster target.
    #[error("duplicate stage region: {region} (stage '{stage}' targets account {account}, already used by stage '{first}')")]
    DuplicateStageTarget {
        stage: String,
        first: String,
        account: String,
        region: String,
    },

    /// A stage id that is not lowercase letters, digits and `-`.
    #[error("invalid stage id '{stage}': use lowercase letters, digits and '-'")]
    InvalidStageId { stage: String },

    /// Two stages share an id.
    #[error("duplicate stage id: {stage}")]
    DuplicateStageId { stage: String },

    /// A bootstrap route points at a namespace no team owns.
    #[error("stage '{stage}': bootstrap route namespace '{namespace}' does not belong to any registered team")]
    UnknownNamespace { stage: String, namespace: String },

    /// A bootstrap add-on carried parameters that are not a bootstrap descriptor.
    #[error("stage '{stage}': malformed bootstrap add-on: {message}")]
    MalformedBootstrap { stage: String, message: String },

    /// The pipeline has nothing to deploy.
    #[error("pipeline '{pipeline}' has no stages")]
    NoStages { pipeline: String },
}

impl ConfigurationError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        ConfigurationError::MissingField {
            field: field.into(),
        }
    }
}

/// Fails with [`ConfigurationError::MissingField`] when `value` is blank.
pub(crate) fn require(field: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::missing(field));
    }
    Ok(())
}

/// All errors that can arise while loading a configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (scaffold path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration file did not exist.
    #[error("configuration not found at {path}")]
    NotFound { path: PathBuf },

    /// The file already exists and `--force` was not given.
    #[error("configuration already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// A setting was neither in the environment nor in the file.
    #[error("{setting} is not set; export {var} or set it in the configuration file")]
    MissingSetting { setting: &'static str, var: &'static str },

    /// The configuration loaded but describes an invalid pipeline.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LoadError {
    LoadError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_target_message_names_region_and_stage() {
        let err = ConfigurationError::DuplicateStageTarget {
            stage: "prod".into(),
            first: "test".into(),
            account: "123456789012".into(),
            region: "us-east-1".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("duplicate stage region: us-east-1"), "got: {msg}");
        assert!(msg.contains("'prod'"));
        assert!(msg.contains("'test'"));
    }

    #[test]
    fn require_rejects_blank() {
        assert_eq!(
            require("owner", "  "),
            Err(ConfigurationError::MissingField { field: "owner".into() })
        );
        assert!(require("owner", "micmarc").is_ok());
    }

    #[test]
    fn missing_setting_names_variable() {
        let err = LoadError::MissingSetting {
            setting: "account",
            var: "CDK_DEFAULT_ACCOUNT",
        };
        assert!(err.to_string().contains("CDK_DEFAULT_ACCOUNT"));
    }
}
