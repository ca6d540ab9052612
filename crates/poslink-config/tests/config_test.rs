#![allow(clippy::unwrap_used)]
// Layered loading: defaults → TOML file → POSLINK_* environment.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;

use poslink_api::SessionToken;
use poslink_config::{
    ApiSection, Config, ConfigError, TokenBackend, load_config_from, save_config_to,
};

fn load(path: &str) -> Result<Config, figment::Error> {
    load_config_from(Path::new(path)).map_err(|e| figment::Error::from(e.to_string()))
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let cfg = load("does-not-exist.toml")?;
        assert_eq!(cfg, Config::default());
        Ok(())
    });
}

#[test]
fn test_file_values_override_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                [api]
                base_url = "https://pos.example.com/api"
                timeout = 30

                [channel]
                max_attempts = 8

                [token]
                backend = "keyring"
            "#,
        )?;

        let cfg = load("config.toml")?;
        assert_eq!(cfg.api.base_url, "https://pos.example.com/api");
        assert_eq!(cfg.api.timeout, 30);
        assert_eq!(cfg.api.max_attempts, 3, "unset keys keep their defaults");
        assert_eq!(cfg.channel.max_attempts, 8);
        assert_eq!(cfg.channel.base_delay_ms, 1000);
        assert_eq!(cfg.token.backend, TokenBackend::Keyring);
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                [api]
                base_url = "http://file.local/api"
                retry_delay_ms = 500
            "#,
        )?;
        jail.set_env("POSLINK_API__BASE_URL", "http://env.local:9000/api");
        jail.set_env("POSLINK_CHANNEL__CONNECT_TIMEOUT_MS", "2500");
        // Flat CLI variables share the prefix and must not disturb sections.
        jail.set_env("POSLINK_BASE_URL", "http://ignored.local");

        let cfg = load("config.toml")?;
        assert_eq!(cfg.api.base_url, "http://env.local:9000/api");
        assert_eq!(cfg.api.retry_delay_ms, 500);

        let channel = cfg.channel_config(SessionToken::default()).unwrap();
        assert_eq!(channel.url.as_str(), "http://env.local:9000/");
        assert_eq!(channel.reconnect.connect_timeout, Duration::from_millis(2500));
        Ok(())
    });
}

#[test]
fn test_malformed_file_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[api]\ntimeout = \"soon\"\n")?;
        let result = load_config_from(Path::new("config.toml"));
        assert!(matches!(result, Err(ConfigError::Figment(_))), "got {result:?}");
        Ok(())
    });
}

#[test]
fn test_saved_config_loads_back() {
    Jail::expect_with(|_jail| {
        let path = Path::new("nested").join("config.toml");
        let cfg = Config {
            api: ApiSection {
                base_url: "https://shop.example.com/api".into(),
                insecure: true,
                ..ApiSection::default()
            },
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[api]"));
        assert!(!written.contains("ca_cert"), "unset options are omitted");

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.api, cfg.api);
        Ok(())
    });
}
