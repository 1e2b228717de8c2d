//! Effective settings: command line and environment over file over defaults.

use std::path::Path;

use instalarm_core::{AlarmResult, AwsConfig, InstalarmConfig};

/// Values given as flags or environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub delete_batch_size: Option<usize>,
}

/// Load the optional config file, apply overrides, validate.
pub fn resolve(path: Option<&Path>, overrides: Overrides) -> AlarmResult<InstalarmConfig> {
    let mut config = match path {
        Some(path) => InstalarmConfig::from_file(path)?,
        None => InstalarmConfig::default(),
    };

    if let Some(bucket) = overrides.bucket {
        config.templates.bucket = Some(bucket);
    }
    if let Some(size) = overrides.delete_batch_size {
        config.alarms.delete_batch_size = size;
    }
    if let Some(region) = overrides.region {
        config.aws = Some(AwsConfig {
            region: Some(region),
        });
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use instalarm_core::AlarmError;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn flags_override_file() {
        let file = config_file(
            r#"
[templates]
bucket = "from-file"

[alarms]
delete_batch_size = 50

[aws]
region = "eu-west-1"
"#,
        );
        let config = resolve(
            Some(file.path()),
            Overrides {
                bucket: Some("from-flag".to_string()),
                region: None,
                delete_batch_size: None,
            },
        )
        .unwrap();

        assert_eq!(config.templates.bucket.as_deref(), Some("from-flag"));
        assert_eq!(config.alarms.delete_batch_size, 50);
        assert_eq!(config.region(), Some("eu-west-1"));
    }

    #[test]
    fn defaults_without_file() {
        let config = resolve(
            None,
            Overrides {
                bucket: Some("templates".to_string()),
                region: Some("us-east-1".to_string()),
                delete_batch_size: None,
            },
        )
        .unwrap();
        assert_eq!(config.alarms.delete_batch_size, 100);
        assert_eq!(config.region(), Some("us-east-1"));
    }

    #[test]
    fn missing_bucket_is_rejected() {
        let err = resolve(None, Overrides::default()).unwrap_err();
        assert!(matches!(err, AlarmError::InvalidArgument(_)));
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let err = resolve(
            None,
            Overrides {
                bucket: Some("b".to_string()),
                region: None,
                delete_batch_size: Some(101),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("delete_batch_size"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = resolve(Some(missing.as_path()), Overrides::default());
        assert!(err.is_err());
    }
}
