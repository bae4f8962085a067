use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A typed config value as handed over by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{}", v),
            ConfigValue::Int(v) => write!(f, "{}", v),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Str(v) => f.write_str(v),
        }
    }
}

pub type ConfigTable = HashMap<String, ConfigValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_config_table() {
        let cfg: ConfigTable = serde_json::from_str(
            r#"{"files": "/run/a.pid:a", "interval": 10, "debug": true}"#,
        )
        .unwrap();
        assert_eq!(cfg["files"].as_str(), Some("/run/a.pid:a"));
        assert_eq!(cfg["interval"], ConfigValue::Int(10));
        assert_eq!(cfg["debug"].as_str(), None);
    }
}
