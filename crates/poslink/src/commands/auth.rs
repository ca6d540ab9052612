//! Session commands: login, logout and token inspection.

use secrecy::{ExposeSecret, SecretString};

use poslink_api::ApiClient;

use crate::cli::{LoginArgs, TokenArgs};
use crate::error::CliError;
use crate::output;

pub async fn login(client: &ApiClient, args: LoginArgs) -> Result<(), CliError> {
    let password = match args.password {
        Some(p) => SecretString::from(p),
        None => SecretString::from(rpassword::prompt_password("Password: ")?),
    };
    if password.expose_secret().is_empty() {
        return Err(CliError::validation("password", "cannot be empty"));
    }

    let response = client.login(&args.username, &password).await?;

    eprintln!("Logged in as {}", args.username);
    if !response.user.is_null() {
        output::print_output(&output::render_json(&response.user)?);
    }
    Ok(())
}

pub fn logout(client: &ApiClient) -> Result<(), CliError> {
    client.logout()?;
    eprintln!("Logged out");
    Ok(())
}

/// Exit with the auth code when nothing is stored, so scripts can branch.
pub fn token(client: &ApiClient, args: &TokenArgs) -> Result<(), CliError> {
    let Some(token) = client.token() else {
        return Err(CliError::AuthFailed {
            message: "no session token stored".into(),
        });
    };
    if args.show {
        output::print_output(token.expose_secret());
    } else {
        output::print_output("Session token stored");
    }
    Ok(())
}
