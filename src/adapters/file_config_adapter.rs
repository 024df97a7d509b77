//! INI file configuration adapter.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::StratlangError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StratlangError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| StratlangError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StratlangError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StratlangError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratlangError {
    StratlangError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, StratlangError> {
        match self.config.getfloat(section, key) {
            Ok(None) => Ok(default),
            Ok(Some(value)) if value.is_finite() => Ok(value),
            Ok(Some(value)) => Err(invalid(
                section,
                key,
                format!("expected a finite number, got {value}"),
            )),
            Err(reason) => Err(invalid(section, key, reason)),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, StratlangError> {
        match self.config.get(section, key) {
            None => Ok(default),
            Some(raw) => Self::parse_bool(&raw).ok_or_else(|| {
                invalid(section, key, format!("expected true or false, got '{raw}'"))
            }),
        }
    }
}
