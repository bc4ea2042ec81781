use std::fmt;
use std::time::Duration;

use lettre::Address;
use rocket::figment::providers::{Env, Format, Toml};
use rocket::figment::{Figment, Profile};
use serde::Deserialize;

/// Listen port when neither Rocket.toml, ROCKET_PORT nor PORT say otherwise.
pub const DEFAULT_PORT: u16 = 3000;

/// Values from old setup guides, rejected at load time.
const PLACEHOLDER_USERS: &[&str] = &["your-email@gmail.com", "your-email@example.com"];
const PLACEHOLDER_PASSWORDS: &[&str] = &["your-app-password", "your-password"];

/// Layered configuration source.
///
/// Order (later wins): built-in defaults, `Rocket.toml` (or `$ROCKET_CONFIG`),
/// `ROCKET_*` variables, `PORT`, then `EMAIL_*` variables mapped into the
/// `mail` table (`EMAIL_USER` becomes `mail.user`).
pub fn figment() -> Figment {
    Figment::from(rocket::Config::default())
        .merge(("port", DEFAULT_PORT))
        .merge(("limits.json", "50 MiB"))
        .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
        .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
        .merge(Env::raw().only(&["PORT"]).global())
        .merge(
            Env::prefixed("EMAIL_")
                .map(|key| format!("mail.{}", key).into())
                .global(),
        )
        .select(Profile::from_env_or(
            "ROCKET_PROFILE",
            rocket::Config::DEFAULT_PROFILE,
        ))
}

/// The `mail` table exactly as it was written.
#[derive(Deserialize)]
#[serde(default)]
struct MailSettings {
    user: Option<String>,
    pass: Option<String>,
    host: String,
    port: u16,
    from_name: String,
    timeout_secs: u64,
    cors_origin: String,
    max_sends: u64,
    window_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            user: None,
            pass: None,
            host: "smtp.gmail.com".to_string(),
            port: 587,
            from_name: "Derma Analyzer".to_string(),
            timeout_secs: 30,
            cors_origin: "*".to_string(),
            max_sends: 0,
            window_secs: 60,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} still holds a placeholder value, set real credentials")]
    Placeholder(&'static str),
    #[error("EMAIL_USER is not a valid email address: {0}")]
    InvalidUser(String),
    #[error("invalid configuration: {0}")]
    Figment(#[from] rocket::figment::Error),
}

/// Validated service configuration, built once at startup and handed to
/// Rocket as managed state.
#[derive(Clone)]
pub struct Config {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub user: Address,
    pub pass: String,
    pub from_name: String,
    pub timeout: Duration,
    pub cors_origin: String,
    /// Outbound mails allowed per client within `window`. Zero disables throttling.
    pub max_sends: u64,
    pub window: Duration,
}

impl Config {
    pub fn from_figment(figment: &Figment) -> Result<Config, ConfigError> {
        let settings = match figment.extract_inner::<MailSettings>("mail") {
            Ok(s) => s,
            Err(e) if e.missing() => MailSettings::default(),
            Err(e) => return Err(e.into()),
        };

        let user = settings
            .user
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("EMAIL_USER"))?;
        let pass = settings
            .pass
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::Missing("EMAIL_PASS"))?;

        if PLACEHOLDER_USERS.contains(&user.trim()) {
            return Err(ConfigError::Placeholder("EMAIL_USER"));
        }
        if PLACEHOLDER_PASSWORDS.contains(&pass.as_str()) {
            return Err(ConfigError::Placeholder("EMAIL_PASS"));
        }

        let user: Address = user
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidUser(user.clone()))?;

        Ok(Config {
            smtp_host: settings.host,
            smtp_port: settings.port,
            user,
            pass,
            from_name: settings.from_name,
            timeout: Duration::from_secs(settings.timeout_secs),
            cors_origin: settings.cors_origin,
            max_sends: settings.max_sends,
            window: Duration::from_secs(settings.window_secs),
        })
    }

    /// Mail user shortened for logs and API responses: `abc...`
    pub fn masked_user(&self) -> String {
        mask(self.user.as_ref())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("user", &self.masked_user())
            .field("pass", &"***")
            .field("from_name", &self.from_name)
            .field("timeout", &self.timeout)
            .field("cors_origin", &self.cors_origin)
            .field("max_sends", &self.max_sends)
            .field("window", &self.window)
            .finish()
    }
}

fn mask(value: &str) -> String {
    let head: String = value.chars().take(3).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rocket::data::{Limits, ToByteUnit};

    fn with_mail(user: &str, pass: &str) -> Figment {
        Figment::new()
            .merge(("mail.user", user))
            .merge(("mail.pass", pass))
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = Config::from_figment(&with_mail("sender@example.com", "hunter2")).unwrap();
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from_name, "Derma Analyzer");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.max_sends, 0);
        assert_eq!(config.user.to_string(), "sender@example.com");
    }

    #[test]
    fn overrides_are_honoured() {
        let figment = with_mail("sender@example.com", "hunter2")
            .merge(("mail.host", "smtp.example.com"))
            .merge(("mail.port", 2525))
            .merge(("mail.max_sends", 5));
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config.smtp_host, "smtp.example.com");
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.max_sends, 5);
    }

    #[test]
    fn missing_user_fails_fast() {
        let err = Config::from_figment(&Figment::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("EMAIL_USER")));
        assert_eq!(err.to_string(), "EMAIL_USER is not set");
    }

    #[test]
    fn missing_password_fails_fast() {
        let figment = Figment::new().merge(("mail.user", "sender@example.com"));
        let err = Config::from_figment(&figment).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("EMAIL_PASS")));
    }

    #[test]
    fn placeholder_credentials_are_rejected() {
        let err = Config::from_figment(&with_mail("your-email@gmail.com", "x")).unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder("EMAIL_USER")));

        let err = Config::from_figment(&with_mail("a@b.com", "your-app-password")).unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder("EMAIL_PASS")));
    }

    #[test]
    fn user_must_be_an_address() {
        let err = Config::from_figment(&with_mail("not an address", "x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUser(_)));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let config = Config::from_figment(&with_mail("sender@example.com", "hunter2")).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("sen..."));
    }

    // ── Layering through figment() ─────────────────────

    fn pin_rocket_env(jail: &mut Jail, profile: &str) {
        jail.set_env("ROCKET_CONFIG", "Rocket.toml");
        jail.set_env("ROCKET_PROFILE", profile);
    }

    #[test]
    fn environment_supplies_credentials_and_port() {
        Jail::expect_with(|jail| {
            pin_rocket_env(jail, "debug");
            jail.set_env("EMAIL_USER", "clinic@example.com");
            jail.set_env("EMAIL_PASS", "app-secret");
            jail.set_env("EMAIL_MAX_SENDS", "7");
            jail.set_env("PORT", "4321");

            let figment = figment();
            let config = Config::from_figment(&figment).expect("config from env");
            assert_eq!(config.user.to_string(), "clinic@example.com");
            assert_eq!(config.pass, "app-secret");
            assert_eq!(config.max_sends, 7);
            assert_eq!(figment.extract_inner::<u16>("port")?, 4321);
            Ok(())
        });
    }

    #[test]
    fn built_in_defaults_cover_port_and_body_limit() {
        Jail::expect_with(|jail| {
            pin_rocket_env(jail, "debug");
            jail.set_env("EMAIL_USER", "clinic@example.com");
            jail.set_env("EMAIL_PASS", "app-secret");

            let figment = figment();
            let limits: Limits = figment.extract_inner("limits")?;
            assert_eq!(limits.get("json"), Some(50.mebibytes()));
            assert_eq!(Config::from_figment(&figment).unwrap().smtp_port, 587);
            Ok(())
        });
    }

    #[test]
    fn rocket_toml_profiles_layer_over_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Rocket.toml",
                r#"
                [default]
                port = 3100

                [default.mail]
                host = "smtp.example.com"
                user = "toml@example.com"
                pass = "toml-secret"

                [release.mail]
                max_sends = 20
                "#,
            )?;

            pin_rocket_env(jail, "debug");
            let figment = figment();
            let config = Config::from_figment(&figment).expect("config from Rocket.toml");
            assert_eq!(config.smtp_host, "smtp.example.com");
            assert_eq!(config.user.to_string(), "toml@example.com");
            assert_eq!(config.max_sends, 0);
            assert_eq!(figment.extract_inner::<u16>("port")?, 3100);

            pin_rocket_env(jail, "release");
            let config = Config::from_figment(&super::figment()).expect("release config");
            assert_eq!(config.smtp_host, "smtp.example.com");
            assert_eq!(config.max_sends, 20);
            Ok(())
        });
    }

    #[test]
    fn environment_wins_over_rocket_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Rocket.toml",
                r#"
                [default.mail]
                user = "toml@example.com"
                pass = "toml-secret"
                "#,
            )?;
            pin_rocket_env(jail, "debug");
            jail.set_env("EMAIL_USER", "env@example.com");

            let config = Config::from_figment(&figment()).expect("merged config");
            assert_eq!(config.user.to_string(), "env@example.com");
            assert_eq!(config.pass, "toml-secret");
            Ok(())
        });
    }
}
