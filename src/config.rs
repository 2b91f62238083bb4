// missivectl - CLI and connector for the Missive API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::client::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Copy with the token replaced by a mask, for display.
    pub fn masked(&self) -> Self {
        Self {
            api_token: self.api_token.as_ref().map(|_| "*****".to_string()),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error(
        "API token is required; set it with `missivectl configure --token <token>` or MISSIVE_API_TOKEN"
    )]
    MissingApiToken,
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub api_token: String,
    pub base_url: String,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".missivectl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("MISSIVECTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("missivectl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

/// Merge user and local files, then apply command-line overrides.
pub fn resolve(
    cwd: &Path,
    api_token_override: Option<String>,
    base_url_override: Option<String>,
) -> Result<EffectiveConfig> {
    let mut merged = load(cwd)?;

    if let Some(token) = api_token_override {
        merged.api_token = Some(token);
    }
    if let Some(url) = base_url_override {
        merged.base_url = Some(url);
    }

    let api_token = merged
        .api_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingApiToken)?;

    let base_url = merged
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Ok(EffectiveConfig {
        api_token,
        base_url,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        api_token: local.api_token.or(user.api_token),
        base_url: local.base_url.or(user.base_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::{env, fs};
    use tempfile::{TempDir, tempdir};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn isolated() -> (MutexGuard<'static, ()>, TempDir) {
        let guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var("MISSIVECTL_CONFIG_DIR", cwd.path().join("config"));
            env::set_var("XDG_CONFIG_HOME", cwd.path().join("xdg"));
        }
        fs::create_dir_all(cwd.path().join("config")).unwrap();
        fs::create_dir_all(cwd.path().join("xdg")).unwrap();
        (guard, cwd)
    }

    #[test]
    fn merges_user_and_local_and_overrides() {
        let (_guard, cwd) = isolated();

        let user_cfg = Config {
            api_token: Some("user-token".into()),
            base_url: Some("https://example.test/v1".into()),
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();

        let local_cfg = Config {
            api_token: Some("  local-token \n".into()),
            base_url: None,
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let effective = resolve(cwd.path(), None, None).unwrap();
        assert_eq!(effective.api_token, "local-token");
        assert_eq!(effective.base_url, "https://example.test/v1");

        let overridden = resolve(
            cwd.path(),
            Some("override".into()),
            Some("https://override.test".into()),
        )
        .unwrap();
        assert_eq!(overridden.api_token, "override");
        assert_eq!(overridden.base_url, "https://override.test");

        assert_eq!(load_scope(Scope::User, cwd.path()).unwrap(), user_cfg);
    }

    #[test]
    fn defaults_to_public_api() {
        let (_guard, cwd) = isolated();
        let effective = resolve(cwd.path(), Some("t".into()), None).unwrap();
        assert_eq!(effective.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn errors_when_missing_token() {
        let (_guard, cwd) = isolated();
        let err = resolve(cwd.path(), None, None).unwrap_err();
        assert!(err.to_string().contains("API token is required"));

        let err = resolve(cwd.path(), Some("   ".into()), None).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn masked_hides_token() {
        let cfg = Config {
            api_token: Some("secret".into()),
            base_url: None,
        };
        assert_eq!(cfg.masked().api_token.as_deref(), Some("*****"));
        assert_eq!(Config::default().masked().api_token, None);
    }
}
