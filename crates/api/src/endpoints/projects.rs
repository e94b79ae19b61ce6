use serde::Deserialize;
use serde_json::json;

use operis_core::domain::message::{ChatMessage, MessageId, MessageType};
use operis_core::domain::project::{Project, ProjectId};

use crate::client::ApiClient;
use crate::error::ApiError;

pub async fn list(client: &ApiClient) -> Result<Vec<Project>, ApiError> {
    client.get_json("/projects").await
}

pub async fn get(client: &ApiClient, id: ProjectId) -> Result<Project, ApiError> {
    client.get_json(&format!("/projects/{id}")).await
}

pub async fn list_messages(
    client: &ApiClient,
    project: ProjectId,
    limit: Option<u32>,
) -> Result<Vec<ChatMessage>, ApiError> {
    let path = format!("/projects/{project}/messages");
    match limit {
        Some(limit) => {
            client.get_json_with_query(&path, &[("limit", limit.to_string())]).await
        }
        None => client.get_json(&path).await,
    }
}

pub async fn send_message(
    client: &ApiClient,
    project: ProjectId,
    message: &str,
    message_type: MessageType,
) -> Result<ChatMessage, ApiError> {
    client
        .post_json(
            &format!("/projects/{project}/messages"),
            &json!({ "message": message, "message_type": message_type }),
        )
        .await
}

pub async fn mark_message_read(
    client: &ApiClient,
    project: ProjectId,
    message: MessageId,
) -> Result<(), ApiError> {
    let _: serde_json::Value =
        client.post_action(&format!("/projects/{project}/messages/{message}/read")).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    #[serde(default)]
    unread_count: u64,
}

pub async fn unread_count(client: &ApiClient, project: ProjectId) -> Result<u64, ApiError> {
    let count: UnreadCount = client.get_json(&format!("/projects/{project}/unread-count")).await?;
    Ok(count.unread_count)
}
