//! Command dispatch: bridges CLI args to `poslink_api` calls and output.

pub mod auth;
pub mod config_cmd;
pub mod products;
pub mod request;
pub mod watch;

use poslink_api::ApiClient;
use poslink_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    client: &ApiClient,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(client, args).await,
        Command::Logout => auth::logout(client),
        Command::Token(args) => auth::token(client, &args),
        Command::Request(args) => request::handle(client, args).await,
        Command::Products(args) => products::handle(client, args).await,
        Command::Watch(args) => watch::handle(client, cfg, &args, global).await,
        // Handled before a client is built
        Command::Config(_) => unreachable!(),
    }
}
