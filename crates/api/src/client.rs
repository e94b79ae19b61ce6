use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;

use operis_core::config::ApiConfig;

use crate::error::{error_detail, ApiError};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, ApiTransport, ReqwestTransport};

#[derive(serde::Deserialize)]
struct RefreshedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// HTTP gateway: attaches the bearer token to every request and, on a
/// 401, performs exactly one token refresh no matter how many requests
/// hit the wall concurrently, then retries each of them once.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    session: SessionStore,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), session))
    }

    /// Seam for tests and alternative transports.
    pub fn with_transport(transport: Arc<dyn ApiTransport>, session: SessionStore) -> Self {
        Self { transport, session, refresh_gate: Arc::new(Mutex::new(())) }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, value.clone());
        }
        self.send(request).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).with_body(serde_json::to_value(body)?)).await
    }

    /// POST with the empty `{}` body most action endpoints take.
    pub async fn post_action<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).with_body(json!({}))).await
    }

    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).with_body(serde_json::to_value(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.execute_authenticated(ApiRequest::delete(path)).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(ApiError::Api { status: response.status, detail: error_detail(&response.body) })
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute_authenticated(request).await?;
        Self::parse(response)
    }

    /// Execute without credentials; used by login/register/refresh,
    /// which must never recurse into the refresh gate.
    pub(crate) async fn execute_public(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.transport.execute(request).await?)
    }

    pub(crate) fn parse<T: DeserializeOwned>(response: ApiResponse) -> Result<T, ApiError> {
        if !response.is_success() {
            return Err(ApiError::Api {
                status: response.status,
                detail: error_detail(&response.body),
            });
        }
        Ok(response.json()?)
    }

    async fn execute_authenticated(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (token, generation) = self.session.access_token_with_generation();
        let token = token.ok_or(ApiError::NotAuthenticated)?;

        let response = self.transport.execute(request.clone().with_bearer(token)).await?;
        if response.status != 401 {
            return Ok(response);
        }

        self.refresh_access_token(generation, &request.path).await?;

        let token = self.session.access_token().ok_or(ApiError::SessionExpired)?;
        let response = self.transport.execute(request.clone().with_bearer(token)).await?;
        if response.status == 401 {
            // The freshly minted token was rejected too; nothing left to try.
            self.force_logout(&request.path);
            return Err(ApiError::SessionExpired);
        }
        Ok(response)
    }

    /// Single-flight refresh. `observed_generation` is the token
    /// generation the caller saw when it received the 401; if the
    /// generation moved while waiting for the gate, another caller
    /// already refreshed and this one just retries.
    async fn refresh_access_token(
        &self,
        observed_generation: u64,
        return_url: &str,
    ) -> Result<(), ApiError> {
        let _guard = self.refresh_gate.lock().await;
        if self.session.token_generation() != observed_generation {
            return Ok(());
        }

        let Some(refresh) = self.session.refresh_token() else {
            self.force_logout(return_url);
            return Err(ApiError::SessionExpired);
        };

        let request = ApiRequest::post("/auth/refresh")
            .with_body(json!({ "refresh_token": refresh.expose_secret() }));

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "token refresh transport failure");
                self.force_logout(return_url);
                return Err(ApiError::SessionExpired);
            }
        };

        if !response.is_success() {
            tracing::warn!(status = response.status, "token refresh rejected");
            self.force_logout(return_url);
            return Err(ApiError::SessionExpired);
        }

        let tokens: RefreshedTokens = response.json()?;
        self.session
            .install_tokens(tokens.access_token.into(), tokens.refresh_token.map(Into::into))?;
        tracing::debug!("access token refreshed");
        Ok(())
    }

    fn force_logout(&self, return_url: &str) {
        tracing::warn!(return_url, "clearing session after auth failure");
        self.session.clear(Some(return_url.to_string()));
    }

}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;
    use uuid::Uuid;

    use operis_core::domain::user::{Role, UserId, UserProfile};

    use super::ApiClient;
    use crate::error::ApiError;
    use crate::session::SessionStore;
    use crate::transport::{ApiRequest, ApiResponse, ApiTransport, TransportError};

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId(Uuid::new_v4()),
            email: "user@operis.vn".to_string(),
            full_name: "User".to_string(),
            role: Role::Customer,
            is_active: true,
        }
    }

    fn logged_in_session() -> SessionStore {
        let session = SessionStore::in_memory();
        session
            .install_login(
                SecretString::from("stale-token".to_string()),
                Some(SecretString::from("refresh-token".to_string())),
                profile(),
            )
            .expect("install");
        session
    }

    /// Transport that 401s any request carrying the stale token, counts
    /// refresh calls, and accepts requests carrying the new token.
    struct RefreshingTransport {
        refresh_calls: AtomicUsize,
        data_calls: AtomicUsize,
        refresh_delay: Duration,
        log: StdMutex<Vec<String>>,
    }

    impl RefreshingTransport {
        fn new(refresh_delay: Duration) -> Self {
            Self {
                refresh_calls: AtomicUsize::new(0),
                data_calls: AtomicUsize::new(0),
                refresh_delay,
                log: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ApiTransport for RefreshingTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            if request.path == "/auth/refresh" {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.refresh_delay).await;
                return Ok(ApiResponse {
                    status: 200,
                    body: serde_json::to_vec(&json!({
                        "access_token": "fresh-token",
                        "refresh_token": "fresh-refresh"
                    }))
                    .expect("serialize"),
                });
            }

            self.data_calls.fetch_add(1, Ordering::SeqCst);
            let bearer = request
                .bearer
                .as_ref()
                .map(|token| token.expose_secret().to_string())
                .unwrap_or_default();
            self.log
                .lock()
                .expect("log lock")
                .push(format!("{} {} [{bearer}]", request.method.as_str(), request.path));

            if bearer == "fresh-token" {
                Ok(ApiResponse { status: 200, body: b"{\"ok\": true}".to_vec() })
            } else {
                Ok(ApiResponse { status: 401, body: b"{\"detail\": \"expired\"}".to_vec() })
            }
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct OkBody {
        ok: bool,
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_401s_share_one_refresh() {
        let transport = Arc::new(RefreshingTransport::new(Duration::from_millis(25)));
        let client = ApiClient::with_transport(transport.clone(), logged_in_session());

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.get_json::<OkBody>("/projects").await })
        };
        let second = {
            let client = client.clone();
            tokio::spawn(async move { client.get_json::<OkBody>("/users/me").await })
        };

        let first = first.await.expect("join").expect("first request should succeed");
        let second = second.await.expect("join").expect("second request should succeed");
        assert!(first.ok && second.ok);

        assert_eq!(
            transport.refresh_calls.load(Ordering::SeqCst),
            1,
            "exactly one refresh call for two concurrent 401s"
        );

        let log = transport.log.lock().expect("log lock");
        let retried_with_fresh =
            log.iter().filter(|line| line.contains("[fresh-token]")).count();
        assert_eq!(retried_with_fresh, 2, "both originals must retry with the new token");
    }

    #[tokio::test]
    async fn refresh_failure_clears_session_with_return_url() {
        struct AlwaysUnauthorized;

        #[async_trait]
        impl ApiTransport for AlwaysUnauthorized {
            async fn execute(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
                Ok(ApiResponse { status: 401, body: Vec::new() })
            }
        }

        let session = logged_in_session();
        let mut changes = session.subscribe();
        let client = ApiClient::with_transport(Arc::new(AlwaysUnauthorized), session.clone());

        let error = client.get_json::<OkBody>("/projects").await.expect_err("must fail");
        assert!(matches!(error, ApiError::SessionExpired));
        assert!(!session.is_authenticated());

        let snapshot = changes.borrow_and_update().clone();
        assert_eq!(snapshot.return_url.as_deref(), Some("/projects"));
    }

    #[tokio::test]
    async fn unauthenticated_call_fails_without_touching_the_wire() {
        let transport = Arc::new(RefreshingTransport::new(Duration::ZERO));
        let client = ApiClient::with_transport(transport.clone(), SessionStore::in_memory());

        let error = client.get_json::<OkBody>("/projects").await.expect_err("must fail");
        assert!(matches!(error, ApiError::NotAuthenticated));
        assert_eq!(transport.data_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn api_error_detail_is_extracted() {
        struct Conflict;

        #[async_trait]
        impl ApiTransport for Conflict {
            async fn execute(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
                Ok(ApiResponse {
                    status: 400,
                    body: b"{\"detail\": \"Deposit already paid\"}".to_vec(),
                })
            }
        }

        let client = ApiClient::with_transport(Arc::new(Conflict), logged_in_session());
        let error = client.get_json::<OkBody>("/proposals/1").await.expect_err("must fail");
        match error {
            ApiError::Api { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Deposit already paid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
