use crate::config::schema::HarnessConfig;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HarnessConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(path, &content)?;
        Self::check(&config)?;
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<HarnessConfig> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config: HarnessConfig = serde_json::from_str(content)?;
                Ok(config)
            }
            Some("yaml") | Some("yml") => {
                let config: HarnessConfig = serde_yaml::from_str(content)?;
                Ok(config)
            }
            Some("toml") => {
                let config: HarnessConfig = toml::from_str(content)?;
                Ok(config)
            }
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn check(config: &HarnessConfig) -> Result<()> {
        config.validate()?;

        if config.targets.is_empty() {
            return Err(Error::Config("at least one target is required".to_string()));
        }

        let mut seen = HashSet::new();
        for target in &config.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
        }

        Ok(())
    }
}
