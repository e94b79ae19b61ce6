use operis_core::domain::template::{ProjectTemplate, TemplateId};

use crate::client::ApiClient;
use crate::error::ApiError;

pub async fn list(client: &ApiClient) -> Result<Vec<ProjectTemplate>, ApiError> {
    client.get_json("/project-templates").await
}

pub async fn get(client: &ApiClient, id: TemplateId) -> Result<ProjectTemplate, ApiError> {
    client.get_json(&format!("/project-templates/{id}")).await
}

/// Create a template. Validation runs locally first so a malformed
/// structure is reported instead of silently dropped.
pub async fn create(
    client: &ApiClient,
    template: &ProjectTemplate,
) -> Result<ProjectTemplate, ApiError> {
    template.validate()?;
    client.post_json("/project-templates", template).await
}

pub async fn update(
    client: &ApiClient,
    id: TemplateId,
    template: &ProjectTemplate,
) -> Result<ProjectTemplate, ApiError> {
    template.validate()?;
    client.put_json(&format!("/project-templates/{id}"), template).await
}

pub async fn delete(client: &ApiClient, id: TemplateId) -> Result<(), ApiError> {
    client.delete(&format!("/project-templates/{id}")).await
}
