//! API client
//!
//! One operation: [`DecortClient::call`]. It signs the request with the
//! session token, POSTs the form to the controller, and hands back the raw
//! response body. Transient failures (network, 5xx) are retried up to the
//! configured bound; a 401 triggers exactly one re-login.

use std::sync::Arc;

use decort_core::context::ReconcileContext;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ClientError;
use crate::form::Form;
use crate::session::{Authenticator, OauthAuthenticator, Session};
use crate::transport::{HttpTransport, Transport, TransportResponse};

/// Shared, reconciliation-safe client for the platform REST surface.
///
/// Cloning is cheap; all clones share the transport and the authenticated
/// session.
#[derive(Clone)]
pub struct DecortClient {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
}

impl DecortClient {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            session: Arc::new(Session::new(authenticator)),
        }
    }

    /// Client with the bundled reqwest transport and OAuth2 authenticator.
    pub fn with_defaults(config: Config) -> Self {
        let authenticator = Arc::new(OauthAuthenticator::new(
            config.sso_url.clone(),
            config.app_id.clone(),
            config.app_secret.clone(),
        ));
        Self::new(config, Arc::new(HttpTransport::new()), authenticator)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// POST `form` to `path` (e.g. `cloudapi/compute/get`) and return the
    /// raw response body.
    pub async fn call(
        &self,
        ctx: &ReconcileContext,
        path: &str,
        form: &Form,
    ) -> Result<String, ClientError> {
        let url = format!("{}/restmachine/{}", self.config.api_url, path);
        let call_id = Uuid::new_v4();
        let mut relogged = false;
        let mut attempt: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let bearer = self.session.bearer(self.transport.as_ref()).await?;

            tracing::debug!(%call_id, %path, attempt, "issuing api call");
            match self.dispatch(ctx, &url, &bearer, form).await {
                Ok(response) if response.is_success() => {
                    return Ok(response.body);
                }
                Ok(TransportResponse { status: 401, .. }) if !relogged => {
                    tracing::debug!(%call_id, "token rejected, re-authenticating once");
                    relogged = true;
                    self.session.refresh(self.transport.as_ref()).await?;
                }
                Ok(TransportResponse { status: 401, body }) => {
                    return Err(ClientError::Auth(body));
                }
                Ok(response) => {
                    let err = ClientError::http(response.status, response.body);
                    if err.is_retryable() && attempt < self.config.retries {
                        attempt += 1;
                        tracing::warn!(%call_id, %path, status = response.status, attempt, "retrying after server error");
                        self.backoff(ctx, attempt).await?;
                    } else {
                        return Err(err);
                    }
                }
                Err(err @ ClientError::Cancelled) | Err(err @ ClientError::DeadlineExceeded) => {
                    return Err(err);
                }
                Err(err) => {
                    if err.is_retryable() && attempt < self.config.retries {
                        attempt += 1;
                        tracing::warn!(%call_id, %path, error = %err, attempt, "retrying after transport error");
                        self.backoff(ctx, attempt).await?;
                    } else {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// One exchange, bounded by the context deadline and cancellation.
    async fn dispatch(
        &self,
        ctx: &ReconcileContext,
        url: &str,
        bearer: &str,
        form: &Form,
    ) -> Result<TransportResponse, ClientError> {
        let request = self.transport.post_form(url, Some(bearer), form);
        match ctx.remaining() {
            Some(left) if left.is_zero() => Err(ClientError::DeadlineExceeded),
            Some(left) => {
                tokio::select! {
                    _ = ctx.cancel_token().cancelled() => Err(ClientError::Cancelled),
                    outcome = tokio::time::timeout(left, request) => match outcome {
                        Ok(result) => result,
                        Err(_) => Err(ClientError::DeadlineExceeded),
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = ctx.cancel_token().cancelled() => Err(ClientError::Cancelled),
                    result = request => result,
                }
            }
        }
    }

    async fn backoff(&self, ctx: &ReconcileContext, attempt: u32) -> Result<(), ClientError> {
        let pause = self.config.retry_delay * attempt;
        ctx.sleep(pause).await.map_err(|_| {
            if ctx.is_cancelled() {
                ClientError::Cancelled
            } else {
                ClientError::DeadlineExceeded
            }
        })
    }
}

impl std::fmt::Debug for DecortClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecortClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AccessToken;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StaticAuth;

    #[async_trait]
    impl Authenticator for StaticAuth {
        async fn login(&self, _transport: &dyn Transport) -> Result<AccessToken, ClientError> {
            Ok(AccessToken::new("test-token"))
        }
    }

    /// Scripted transport: pops one canned response per call.
    struct ScriptedTransport {
        responses: Mutex<Vec<TransportResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<TransportResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post_form(
            &self,
            url: &str,
            _bearer: Option<&str>,
            _form: &Form,
        ) -> Result<TransportResponse, ClientError> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(TransportResponse {
                    status: 200,
                    body: "true".to_string(),
                }))
        }
    }

    fn client_over(transport: Arc<ScriptedTransport>) -> DecortClient {
        let config = Config::new("https://cloud.test", "https://sso.test", "app", "secret")
            .with_retries(2)
            .with_retry_delay(Duration::from_millis(1));
        DecortClient::new(config, transport, Arc::new(StaticAuth))
    }

    #[tokio::test]
    async fn success_returns_raw_body() {
        let transport = Arc::new(ScriptedTransport::new(vec![TransportResponse {
            status: 200,
            body: "101".to_string(),
        }]));
        let client = client_over(transport.clone());
        let ctx = ReconcileContext::background();
        let body = client
            .call(&ctx, "cloudapi/compute/create", &Form::new())
            .await
            .unwrap();
        assert_eq!(body, "101");
        let calls = transport.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            "https://cloud.test/restmachine/cloudapi/compute/create"
        );
    }

    #[tokio::test]
    async fn server_errors_are_retried_to_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            TransportResponse {
                status: 503,
                body: "busy".to_string(),
            },
            TransportResponse {
                status: 200,
                body: "ok".to_string(),
            },
        ]));
        let client = client_over(transport.clone());
        let ctx = ReconcileContext::background();
        let body = client.call(&ctx, "cloudapi/rg/get", &Form::new()).await.unwrap();
        assert_eq!(body, "ok");
        assert_eq!(transport.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![TransportResponse {
            status: 404,
            body: "no such compute".to_string(),
        }]));
        let client = client_over(transport.clone());
        let ctx = ReconcileContext::background();
        let err = client
            .call(&ctx, "cloudapi/compute/get", &Form::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auth_error_relogs_in_exactly_once() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            TransportResponse {
                status: 401,
                body: "expired".to_string(),
            },
            TransportResponse {
                status: 401,
                body: "still expired".to_string(),
            },
        ]));
        let client = client_over(transport.clone());
        let ctx = ReconcileContext::background();
        let err = client
            .call(&ctx, "cloudapi/account/list", &Form::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
        assert_eq!(transport.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_the_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = client_over(transport.clone());
        let ctx = ReconcileContext::background();
        ctx.cancel_token().cancel();
        let err = client
            .call(&ctx, "cloudapi/compute/get", &Form::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert!(transport.calls.lock().unwrap().is_empty());
    }
}
