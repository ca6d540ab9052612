// Session authentication
//
// `POST /auth/login` returns `{ token, user }`. The token becomes the
// client's bearer credential and is persisted through its TokenStore;
// logout only forgets it (the backend keeps no server-side session).

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;

pub(crate) const LOGIN_PATH: &str = "/auth/login";

#[derive(Deserialize)]
struct LoginReply {
    token: String,
    #[serde(default)]
    user: serde_json::Value,
}

/// Result of a successful login. The token itself stays inside the client.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    /// The authenticated user record, as returned by the backend.
    pub user: serde_json::Value,
}

impl ApiClient {
    /// Authenticate with username/password.
    ///
    /// On success the returned token replaces any previous one and is
    /// persisted, so a client built later over the same store starts
    /// authenticated.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<LoginResponse, Error> {
        debug!(username, "logging in");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });
        let reply: LoginReply = self.send_as(ApiRequest::post(LOGIN_PATH).body(body)).await?;

        self.set_token(SecretString::from(reply.token))?;
        info!(username, "login successful");
        Ok(LoginResponse { user: reply.user })
    }

    /// Forget the session token locally and in storage.
    pub fn logout(&self) -> Result<(), Error> {
        self.clear_token()?;
        info!("logged out");
        Ok(())
    }
}
