use serde::Serialize;

use operis_core::domain::user::{UserId, UserProfile};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Clone, Debug, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

pub async fn me(client: &ApiClient) -> Result<UserProfile, ApiError> {
    client.get_json("/users/me").await
}

pub async fn list(client: &ApiClient, search: Option<&str>) -> Result<Vec<UserProfile>, ApiError> {
    match search {
        Some(term) => {
            client
                .get_json_with_query("/users", &[("search", term.to_string())])
                .await
        }
        None => client.get_json("/users").await,
    }
}

pub async fn get(client: &ApiClient, id: UserId) -> Result<UserProfile, ApiError> {
    client.get_json(&format!("/users/{id}")).await
}

pub async fn update(
    client: &ApiClient,
    id: UserId,
    update: &UserUpdate,
) -> Result<UserProfile, ApiError> {
    client.put_json(&format!("/users/{id}"), update).await
}

pub async fn delete(client: &ApiClient, id: UserId) -> Result<(), ApiError> {
    client.delete(&format!("/users/{id}")).await
}
