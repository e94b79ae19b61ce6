use serde::{Deserialize, Serialize};
use serde_json::json;

use operis_core::domain::user::UserProfile;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::ApiRequest;

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Create a new account. Registration does not log the user in; call
/// [`login`] afterwards.
pub async fn register(client: &ApiClient, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
    let response = client
        .execute_public(
            ApiRequest::post("/auth/register").with_body(serde_json::to_value(request)?),
        )
        .await?;
    ApiClient::parse(response)
}

/// Exchange credentials for tokens and install them in the session
/// store, fetching the profile separately when the backend omits it.
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<UserProfile, ApiError> {
    let response = client
        .execute_public(
            ApiRequest::post("/auth/login")
                .with_body(json!({ "email": email, "password": password })),
        )
        .await?;
    let tokens: LoginResponse = ApiClient::parse(response)?;

    client
        .session()
        .install_tokens(tokens.access_token.into(), tokens.refresh_token.map(Into::into))?;

    let profile = match tokens.user {
        Some(profile) => profile,
        None => crate::endpoints::users::me(client).await?,
    };
    client.session().set_profile(profile.clone())?;

    tracing::info!(role = %profile.role, "logged in");
    Ok(profile)
}

/// Drop all local credentials. The backend keeps no session state, so
/// this never issues a request.
pub fn logout(client: &ApiClient) {
    client.session().clear(None);
}
