use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use teloxide::types::UserId;

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub telegram: Telegram,
    pub settings_file: String,
    pub server_addr: SocketAddr,
    pub moderation: Moderation,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Telegram {
    pub token: String,
    /// Deployment-time allowlist: these users may change any chat's settings.
    pub admins: Vec<UserId>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Moderation {
    #[serde(default)]
    pub auth_policy: AuthPolicy,
    #[serde(default)]
    pub per_chat_exemptions: bool,
    #[serde(default)]
    pub announce_restart: bool,
}

/// Which chat roles count as elevated for settings commands.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    OwnerOnly,
    #[default]
    AdminOrOwner,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_example_config() -> anyhow::Result<()> {
        let config_text = std::fs::read_to_string("config.example.yaml")?;
        let config: Config = serde_yaml::from_str(&config_text)?;

        similar_asserts::assert_serde_eq!(
            serde_yaml::to_value(&config)?,
            serde_yaml::from_str::<serde_yaml::Value>(&config_text)?,
            "Extra fields in config.example.yaml?",
        );

        Ok(())
    }
}
