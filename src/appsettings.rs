use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::reminder::UserId;

#[derive(Deserialize, Debug, Clone)]
pub struct BackendSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Keep reminders in process memory instead of talking to `base_url`.
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserSettings {
    pub id: Option<UserId>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub user: UserSettings,
}

impl AppSettings {
    /// `appsettings` (required), then `appsettings.local`, then `APP__SECTION__KEY` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(true))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").prefix_separator("__").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
