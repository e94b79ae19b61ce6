use serde::Serialize;

use operis_core::domain::service::{Service, ServiceRequest, ServiceRequestId};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Clone, Debug, Serialize)]
pub struct ServiceRequestDraft {
    pub service_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<rust_decimal::Decimal>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ServiceRequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub async fn list(client: &ApiClient) -> Result<Vec<Service>, ApiError> {
    client.get_json("/services").await
}

pub async fn get(client: &ApiClient, slug: &str) -> Result<Service, ApiError> {
    client.get_json(&format!("/services/{slug}")).await
}

pub async fn create(client: &ApiClient, service: &Service) -> Result<Service, ApiError> {
    client.post_json("/services", service).await
}

pub async fn create_request(
    client: &ApiClient,
    draft: &ServiceRequestDraft,
) -> Result<ServiceRequest, ApiError> {
    client.post_json("/services/requests", draft).await
}

pub async fn list_requests(client: &ApiClient) -> Result<Vec<ServiceRequest>, ApiError> {
    client.get_json("/services/requests").await
}

pub async fn get_request(
    client: &ApiClient,
    id: ServiceRequestId,
) -> Result<ServiceRequest, ApiError> {
    client.get_json(&format!("/services/requests/{id}")).await
}

pub async fn update_request(
    client: &ApiClient,
    id: ServiceRequestId,
    update: &ServiceRequestUpdate,
) -> Result<ServiceRequest, ApiError> {
    client.put_json(&format!("/services/requests/{id}"), update).await
}
