//! HTTP client for the document-chat backend.
//!
//! [`Citeline`] attaches the current bearer token to every request and
//! transparently recovers from a single expired-token failure: on a 401 it
//! refreshes the token pair once and replays the original request, so the
//! caller never observes the 401. Any other failure, or a request that has
//! already been retried, propagates unchanged. Concurrent 401s coalesce into
//! a single in-flight refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Method, header};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::credentials::{AuthFailureHook, CredentialStore, TokenPair};
use crate::error::{Error, Result, extract_detail};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, TOKEN_REFRESH_COALESCED,
    TOKEN_REFRESH_FAILURES, TOKEN_REFRESHES,
};
use crate::types::{
    DocumentPage, FeedbackParams, FeedbackVerdict, Message, MessageSendParams,
    MessageSendResponse, Session, SessionCreateParams, SessionPage, SessionUpdateParams,
    SessionWithMessages,
};

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A request as seen by the transport layer.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL, without a leading slash.
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// JSON request body, if any.
    pub body: Option<serde_json::Value>,
    /// Bearer token to attach, if any.
    pub bearer: Option<String>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }
}

/// A response as seen by the transport layer: status plus raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP exchange.
///
/// The refresh/replay protocol lives above this seam, so tests drive it with
/// scripted transports instead of a real HTTP stack.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes the request and returns the response, or a transport-level
    /// error when no response was received.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// The reqwest-backed transport.
struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method, &url)
            .header(header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(bearer) = &request.bearer {
            builder = builder.bearer_auth(bearer);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response body: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(ApiResponse { status, body })
    }
}

/// Decides whether a failed request should trigger a token refresh and a
/// replay.
///
/// True only for the first 401 of a request when a refresh token exists;
/// this bounds the recursion to exactly one retry.
pub fn should_attempt_refresh(status: u16, attempt: u32, has_refresh_token: bool) -> bool {
    status == 401 && attempt == 0 && has_refresh_token
}

/// Client for the document-chat backend.
#[derive(Clone)]
pub struct Citeline {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    refresh_gate: Arc<Mutex<()>>,
    on_auth_failure: Option<AuthFailureHook>,
}

impl std::fmt::Debug for Citeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Citeline").finish_non_exhaustive()
    }
}

impl Citeline {
    /// Create a new client against the default base URL.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_options(credentials, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        credentials: Arc<dyn CredentialStore>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = match base_url {
            Some(mut url) => {
                if !url.ends_with('/') {
                    url.push('/');
                }
                url
            }
            None => DEFAULT_API_URL.to_string(),
        };
        // Catch malformed URLs here rather than at request time.
        url::Url::parse(&base_url)
            .map_err(|e| Error::url(format!("invalid base URL {base_url:?}"), Some(e)))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let transport = Arc::new(HttpTransport::new(base_url, timeout)?);
        Ok(Self::with_transport(transport, credentials))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            transport,
            credentials,
            refresh_gate: Arc::new(Mutex::new(())),
            on_auth_failure: None,
        }
    }

    /// Install a hook invoked when a token refresh fails irrecoverably.
    ///
    /// The credential store has already been cleared when the hook fires.
    pub fn with_auth_failure_hook(mut self, hook: AuthFailureHook) -> Self {
        self.on_auth_failure = Some(hook);
        self
    }

    /// Returns the credential store this client reads from.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Create a chat session, optionally scoped to documents.
    pub async fn create_session(&self, params: SessionCreateParams) -> Result<Session> {
        let mut request = ApiRequest::new(Method::POST, "chat/sessions");
        request.body = Some(serde_json::to_value(&params)?);
        self.request(request).await
    }

    /// List sessions, newest first.
    pub async fn list_sessions(&self, page: u32, size: u32) -> Result<SessionPage> {
        let mut request = ApiRequest::new(Method::GET, "chat/sessions");
        request.query = vec![
            ("page".to_string(), page.to_string()),
            ("size".to_string(), size.to_string()),
        ];
        self.request(request).await
    }

    /// Fetch a session together with its full message history.
    pub async fn get_session(&self, id: i64) -> Result<SessionWithMessages> {
        let request = ApiRequest::new(Method::GET, format!("chat/sessions/{id}"));
        self.request(request).await
    }

    /// Update a session's title, pinned state, or document scoping.
    pub async fn update_session(
        &self,
        id: i64,
        params: SessionUpdateParams,
    ) -> Result<Session> {
        if params.is_empty() {
            return Err(Error::validation("update contains no changes", None));
        }
        let mut request = ApiRequest::new(Method::PATCH, format!("chat/sessions/{id}"));
        request.body = Some(serde_json::to_value(&params)?);
        self.request(request).await
    }

    /// Delete a session; `permanent` skips the soft-delete.
    pub async fn delete_session(&self, id: i64, permanent: bool) -> Result<()> {
        let mut request = ApiRequest::new(Method::DELETE, format!("chat/sessions/{id}"));
        request.query = vec![("permanent".to_string(), permanent.to_string())];
        self.request_no_content(request).await
    }

    /// Send a message to a session and receive the assistant's answer.
    pub async fn send_message(
        &self,
        session_id: i64,
        params: MessageSendParams,
    ) -> Result<MessageSendResponse> {
        if params.content.trim().is_empty() {
            return Err(Error::validation(
                "message content must not be blank",
                Some("content".to_string()),
            ));
        }
        let mut request = ApiRequest::new(
            Method::POST,
            format!("chat/sessions/{session_id}/messages"),
        );
        request.body = Some(serde_json::to_value(&params)?);
        self.request(request).await
    }

    /// Record a feedback verdict on a message.
    pub async fn submit_feedback(
        &self,
        message_id: i64,
        verdict: FeedbackVerdict,
    ) -> Result<Message> {
        let mut request = ApiRequest::new(
            Method::POST,
            format!("chat/messages/{message_id}/feedback"),
        );
        request.body = Some(serde_json::to_value(FeedbackParams::new(verdict))?);
        self.request(request).await
    }

    /// List documents available for scoping.
    pub async fn list_documents(&self) -> Result<DocumentPage> {
        let request = ApiRequest::new(Method::GET, "documents");
        self.request(request).await
    }

    async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send_with_refresh(request).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn request_no_content(&self, request: ApiRequest) -> Result<()> {
        self.send_with_refresh(request).await.map(|_| ())
    }

    /// Executes the request, refreshing the token pair and replaying once if
    /// the first attempt comes back 401.
    async fn send_with_refresh(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = 0u32;
        loop {
            let bearer = self
                .credentials
                .tokens()
                .map(|pair| pair.access_token);
            let mut outgoing = request.clone();
            outgoing.bearer = bearer.clone();

            CLIENT_REQUESTS.click();
            let start = Instant::now();
            let result = self.transport.execute(outgoing).await;
            CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    // Transport failures (no response) pass through untouched.
                    CLIENT_REQUEST_ERRORS.click();
                    return Err(err);
                }
            };

            if response.is_success() {
                return Ok(response);
            }

            let has_refresh_token = self
                .credentials
                .tokens()
                .map(|pair| !pair.refresh_token.is_empty())
                .unwrap_or(false);
            if should_attempt_refresh(response.status, attempt, has_refresh_token) {
                attempt += 1;
                self.refresh_tokens(bearer.as_deref()).await?;
                continue;
            }

            CLIENT_REQUEST_ERRORS.click();
            return Err(process_error_response(response));
        }
    }

    /// Exchanges the refresh token for a new pair.
    ///
    /// `stale_access` is the access token the failing request carried. All
    /// refreshes serialize on a single gate; once inside, a caller whose
    /// stale token no longer matches the store knows a sibling already
    /// refreshed and skips the round-trip.
    async fn refresh_tokens(&self, stale_access: Option<&str>) -> Result<()> {
        let _guard = self.refresh_gate.lock().await;

        let Some(current) = self.credentials.tokens() else {
            return Err(Error::authentication("not authenticated"));
        };
        if let Some(stale) = stale_access
            && stale != current.access_token
        {
            TOKEN_REFRESH_COALESCED.click();
            return Ok(());
        }

        TOKEN_REFRESHES.click();
        let mut request = ApiRequest::new(Method::POST, "auth/refresh");
        request.query = vec![("refresh_token".to_string(), current.refresh_token)];

        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => {
                let pair: TokenPair = serde_json::from_str(&response.body).map_err(|e| {
                    Error::serialization(
                        format!("Failed to parse refresh response: {}", e),
                        Some(Box::new(e)),
                    )
                })?;
                self.credentials.store(pair);
                Ok(())
            }
            Ok(response) => {
                self.auth_failed();
                Err(process_error_response(response))
            }
            Err(err) => {
                self.auth_failed();
                Err(err)
            }
        }
    }

    fn auth_failed(&self) {
        TOKEN_REFRESH_FAILURES.click();
        self.credentials.clear();
        if let Some(hook) = &self.on_auth_failure {
            hook();
        }
    }
}

/// Convert a non-2xx response into the appropriate error, extracting the
/// backend's `detail` message when present.
fn process_error_response(response: ApiResponse) -> Error {
    let message = extract_detail(&response.body).unwrap_or_else(|| {
        if response.body.trim().is_empty() {
            format!("HTTP {}", response.status)
        } else {
            response.body.clone()
        }
    });

    match response.status {
        400 | 422 => Error::bad_request(message, None),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, None),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, None),
        status => Error::api(status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Transport that replays a scripted sequence of responses and records
    /// every request it sees.
    struct ScriptedTransport {
        responses: StdMutex<VecDeque<Result<ApiResponse>>>,
        requests: StdMutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn ok(body: &str) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(status: u16, body: &str) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status,
            body: body.to_string(),
        })
    }

    fn store_with(access: &str, refresh: &str) -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_tokens(TokenPair::new(
            access, refresh,
        )))
    }

    const SESSION_BODY: &str = r#"{"id":3,"document_ids":[],"message_count":0,"is_pinned":false,"created_at":"2024-05-01T12:00:00Z","updated_at":"2024-05-01T12:00:00Z"}"#;

    #[test]
    fn refresh_decision_table() {
        assert!(should_attempt_refresh(401, 0, true));
        assert!(!should_attempt_refresh(401, 1, true));
        assert!(!should_attempt_refresh(401, 0, false));
        assert!(!should_attempt_refresh(403, 0, true));
        assert!(!should_attempt_refresh(500, 0, true));
    }

    #[tokio::test]
    async fn bearer_attached_from_store() {
        let transport = ScriptedTransport::new(vec![ok(SESSION_BODY)]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let session = client
            .create_session(SessionCreateParams::new())
            .await
            .unwrap();
        assert_eq!(session.id, 3);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer.as_deref(), Some("access-1"));
        assert_eq!(requests[0].path, "chat/sessions");
    }

    #[tokio::test]
    async fn unauthenticated_request_has_no_bearer() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"items":[],"total":0}"#)]);
        let store = Arc::new(MemoryCredentialStore::new());
        let client = Citeline::with_transport(transport.clone(), store);

        client.list_documents().await.unwrap();
        assert_eq!(transport.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn expired_token_refreshed_and_replayed_transparently() {
        let transport = ScriptedTransport::new(vec![
            status(401, r#"{"detail":"Token expired"}"#),
            ok(r#"{"access_token":"access-2","refresh_token":"refresh-2"}"#),
            ok(SESSION_BODY),
        ]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store.clone());

        // The caller observes only the successful final result.
        let session = client
            .create_session(SessionCreateParams::new())
            .await
            .unwrap();
        assert_eq!(session.id, 3);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].path, "auth/refresh");
        assert_eq!(requests[1].bearer, None);
        assert_eq!(
            requests[1].query,
            vec![("refresh_token".to_string(), "refresh-1".to_string())]
        );
        assert_eq!(requests[2].bearer.as_deref(), Some("access-2"));
        assert_eq!(
            store.tokens(),
            Some(TokenPair::new("access-2", "refresh-2"))
        );
    }

    #[tokio::test]
    async fn refresh_failure_clears_store_and_fires_hook() {
        let transport = ScriptedTransport::new(vec![
            status(401, r#"{"detail":"Token expired"}"#),
            status(401, r#"{"detail":"Refresh token revoked"}"#),
        ]);
        let store = store_with("access-1", "refresh-1");
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        let client = Citeline::with_transport(transport.clone(), store.clone())
            .with_auth_failure_hook(Arc::new(move || {
                fired_clone.store(true, Ordering::SeqCst);
            }));

        let err = client
            .create_session(SessionCreateParams::new())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.user_message(), "Refresh token revoked");
        assert!(store.tokens().is_none());
        assert!(fired.load(Ordering::SeqCst));
        // Original request, refresh call, and nothing after.
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn second_401_after_replay_propagates() {
        let transport = ScriptedTransport::new(vec![
            status(401, r#"{"detail":"Token expired"}"#),
            ok(r#"{"access_token":"access-2","refresh_token":"refresh-2"}"#),
            status(401, r#"{"detail":"Still unauthorized"}"#),
        ]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client
            .create_session(SessionCreateParams::new())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn missing_refresh_token_propagates_original_401() {
        let transport =
            ScriptedTransport::new(vec![status(401, r#"{"detail":"Not authenticated"}"#)]);
        let store = Arc::new(MemoryCredentialStore::new());
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client
            .create_session(SessionCreateParams::new())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn non_auth_errors_pass_through_unchanged() {
        let transport =
            ScriptedTransport::new(vec![status(404, r#"{"detail":"Session not found"}"#)]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client.get_session(99).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Session not found");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let transport = ScriptedTransport::new(vec![Err(Error::connection(
            "connection refused",
            None,
        ))]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client.get_session(1).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn concurrent_refreshes_coalesce() {
        // Both callers failed with the same stale token; only the first to
        // take the gate performs the round-trip.
        let transport = ScriptedTransport::new(vec![ok(
            r#"{"access_token":"access-2","refresh_token":"refresh-2"}"#,
        )]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store.clone());

        let (first, second) = tokio::join!(
            client.refresh_tokens(Some("access-1")),
            client.refresh_tokens(Some("access-1")),
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(
            store.tokens(),
            Some(TokenPair::new("access-2", "refresh-2"))
        );
    }

    #[tokio::test]
    async fn empty_update_rejected_before_network() {
        let transport = ScriptedTransport::new(vec![]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client
            .update_session(3, SessionUpdateParams::new())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn blank_message_rejected_before_network() {
        let transport = ScriptedTransport::new(vec![]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        let err = client
            .send_message(3, MessageSendParams::new("   "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn malformed_base_url_rejected_before_any_network() {
        let store = Arc::new(MemoryCredentialStore::new());
        let err = Citeline::with_options(store, Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));

        let store = Arc::new(MemoryCredentialStore::new());
        Citeline::with_options(store, Some("http://localhost:9000/api/v1".to_string()), None)
            .unwrap();
    }

    #[tokio::test]
    async fn delete_session_sends_permanent_flag() {
        let transport = ScriptedTransport::new(vec![ok("")]);
        let store = store_with("access-1", "refresh-1");
        let client = Citeline::with_transport(transport.clone(), store);

        client.delete_session(3, true).await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].path, "chat/sessions/3");
        assert_eq!(
            requests[0].query,
            vec![("permanent".to_string(), "true".to_string())]
        );
    }
}
