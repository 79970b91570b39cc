//! Compiler configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_extra_repeat() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Priority given to stubs whose contract sets none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<u32>,

    /// Add the `response-template` transformer to stubs that echo the request
    #[serde(default = "default_true")]
    pub response_templating: bool,

    /// Extra iterations an unbounded repetition may take in generated examples
    #[serde(default = "default_max_extra_repeat")]
    pub max_extra_repeat: u32,

    /// Seed for example generation. Equal seeds give equal stubs.
    #[serde(default)]
    pub seed: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_priority: None,
            response_templating: true,
            max_extra_repeat: default_max_extra_repeat(),
            seed: 0,
        }
    }
}

impl CompilerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: CompilerConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_extra_repeat > 64 {
            anyhow::bail!(
                "maxExtraRepeat of {} would generate unreadable examples; use at most 64",
                self.max_extra_repeat
            );
        }
        Ok(())
    }
}
