//! instalarm.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AlarmError, AlarmResult};

/// Per-call name limit of the alarm service's batch delete.
pub const MAX_DELETE_BATCH: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalarmConfig {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub alarms: AlarmsConfig,
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Bucket holding one template object per alarm key.
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmsConfig {
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            delete_batch_size: default_delete_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
}

fn default_delete_batch_size() -> usize {
    MAX_DELETE_BATCH
}

impl InstalarmConfig {
    pub fn from_file(path: &Path) -> AlarmResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AlarmError::invalid(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AlarmResult<Self> {
        toml::from_str(content).map_err(|e| AlarmError::invalid(format!("config: {e}")))
    }

    /// Check settings that cannot be expressed in the types.
    pub fn validate(&self) -> AlarmResult<()> {
        match &self.templates.bucket {
            Some(bucket) if !bucket.is_empty() => {}
            _ => return Err(AlarmError::invalid("templates.bucket is required")),
        }
        let size = self.alarms.delete_batch_size;
        if size == 0 || size > MAX_DELETE_BATCH {
            return Err(AlarmError::invalid(format!(
                "alarms.delete_batch_size must be in 1..={MAX_DELETE_BATCH}, got {size}"
            )));
        }
        Ok(())
    }

    pub fn region(&self) -> Option<&str> {
        self.aws.as_ref().and_then(|aws| aws.region.as_deref())
    }
}
