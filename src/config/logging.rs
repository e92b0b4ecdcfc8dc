use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Controls how tracing output is initialised.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,  // trace, debug, info, warn, error
    pub format: String, // console or json
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: "console".to_string(),
        }
    }
}
