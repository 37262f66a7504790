use crate::error::ConfigError;

/// Lowest and highest cost factor bcrypt accepts
const MIN_HASHING_COST: u32 = 4;
const MAX_HASHING_COST: u32 = 31;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// `dev` enables the administrative reset endpoint
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl ApplicationSettings {
    pub fn is_dev(&self) -> bool {
        self.platform == "dev"
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Session core settings
///
/// The signing secret must stay stable across restarts, otherwise every
/// outstanding access token stops verifying.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub signing_secret: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,
    /// Upper bound for a client-requested access token lifetime
    #[serde(default = "default_access_token_ttl")]
    pub max_access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_hashing_cost")]
    pub hashing_cost: u32,
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_secret".to_string()));
        }
        if self.access_token_ttl_seconds <= 0 || self.max_access_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "access token lifetimes must be positive".to_string(),
            ));
        }
        if self.access_token_ttl_seconds > self.max_access_token_ttl_seconds {
            return Err(ConfigError::InvalidValue(
                "access_token_ttl_seconds exceeds max_access_token_ttl_seconds".to_string(),
            ));
        }
        if self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "refresh_token_ttl_days must be positive".to_string(),
            ));
        }
        if !(MIN_HASHING_COST..=MAX_HASHING_COST).contains(&self.hashing_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "hashing_cost must be between {} and {}",
                MIN_HASHING_COST, MAX_HASHING_COST
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_platform() -> String {
    "prod".to_string()
}

fn default_access_token_ttl() -> i64 {
    3600
}

fn default_refresh_token_ttl_days() -> i64 {
    60
}

fn default_hashing_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Reads `configuration.yaml` (optional) and `APP_*` environment overrides,
/// e.g. `APP_AUTH__SIGNING_SECRET`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_settings() -> AuthSettings {
        AuthSettings {
            signing_secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_ttl_seconds: 3600,
            max_access_token_ttl_seconds: 3600,
            refresh_token_ttl_days: 60,
            hashing_cost: 4,
            rotate_refresh_tokens: false,
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(auth_settings().validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut settings = auth_settings();
        settings.signing_secret = String::new();

        assert!(matches!(settings.validate(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_default_ttl_above_max_rejected() {
        let mut settings = auth_settings();
        settings.access_token_ttl_seconds = 7200;

        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_hashing_cost_out_of_range_rejected() {
        let mut settings = auth_settings();
        settings.hashing_cost = 3;
        assert!(settings.validate().is_err());

        settings.hashing_cost = 32;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_platform_dev() {
        let app = ApplicationSettings {
            host: default_host(),
            port: 8080,
            platform: "dev".to_string(),
        };
        assert!(app.is_dev());
    }
}
