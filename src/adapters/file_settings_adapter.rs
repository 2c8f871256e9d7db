//! INI settings file adapter.

use crate::domain::error::PretradeError;
use crate::ports::settings_port::SettingsPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileSettingsAdapter {
    ini: Ini,
}

impl FileSettingsAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PretradeError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| PretradeError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, PretradeError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| PretradeError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "sim" | "1" => Some(true),
            "false" | "no" | "nao" | "não" | "0" => Some(false),
            _ => None,
        }
    }
}

impl SettingsPort for FileSettingsAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}
