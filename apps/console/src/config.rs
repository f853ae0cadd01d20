use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub store_url: Option<String>,
    pub store_auth: Option<String>,
}

/// File config (`crowdvote.toml`) overridden by environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("crowdvote.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("store_url") {
                settings.store_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("store_auth") {
                settings.store_auth = Some(v.clone());
            }
        }
    }

    if let Ok(v) = std::env::var("APP__STORE_URL") {
        settings.store_url = Some(v);
    }
    if let Ok(v) = std::env::var("APP__STORE_AUTH") {
        settings.store_auth = Some(v);
    }

    settings
}
