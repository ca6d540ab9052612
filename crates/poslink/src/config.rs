//! Effective configuration: the shared config file and environment, with
//! command-line flags applied on top.

use poslink_api::ApiClient;
use poslink_config::{Config, load_config, load_config_from};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load config from `--config` (or the platform default) and apply the
/// global flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = match global.config {
        Some(ref path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.base_url {
        cfg.api.base_url.clone_from(url);
    }
    if global.insecure {
        cfg.api.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.api.timeout = timeout;
    }
}

/// Request client over the configured token store.
pub fn build_client(cfg: &Config) -> Result<ApiClient, CliError> {
    let client = ApiClient::new(&cfg.client_config()?, cfg.token_store()?)?;
    tracing::debug!(base_url = %client.base_url(), authenticated = client.has_token(), "client ready");
    Ok(client)
}
