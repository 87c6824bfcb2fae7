use std::{fs, io::ErrorKind, path::Path};

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "gallery.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryConfig {
    pub api_base_url: String,
    pub file_host_url: String,
    pub file_host_api_key: Option<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/api".into(),
            file_host_url: "https://api.imgbb.com/1/upload".into(),
            file_host_api_key: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_base_url: Option<String>,
    file_host_url: Option<String>,
    file_host_api_key: Option<String>,
}

impl GalleryConfig {
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_url("api_base_url", &self.api_base_url)
    }

    pub fn file_host_endpoint(&self) -> Result<Url, ConfigError> {
        parse_url("file_host_url", &self.file_host_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        self.file_host_endpoint()?;
        Ok(())
    }

    fn apply_file(&mut self, file_cfg: FileConfig) {
        if let Some(v) = file_cfg.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file_cfg.file_host_url {
            self.file_host_url = v;
        }
        if let Some(v) = file_cfg.file_host_api_key {
            self.file_host_api_key = Some(v);
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: [&str; 2]| keys.into_iter().find_map(&lookup);

        if let Some(v) = first(["APP__API_BASE_URL", "GALLERY_API_URL"]) {
            self.api_base_url = v;
        }
        if let Some(v) = first(["APP__FILE_HOST_URL", "GALLERY_FILE_HOST_URL"]) {
            self.file_host_url = v;
        }
        if let Some(v) = first(["APP__FILE_HOST_API_KEY", "GALLERY_FILE_HOST_KEY"]) {
            self.file_host_api_key = Some(v);
        }
    }
}

/// Defaults, then `gallery.toml` in the working directory if present, then
/// environment overrides. `APP__*` variables win over `GALLERY_*`.
pub fn load_config() -> Result<GalleryConfig, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

pub fn load_config_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<GalleryConfig, ConfigError> {
    let mut config = GalleryConfig::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
            config.apply_file(file_cfg);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    config.apply_env(env);
    Ok(config)
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
