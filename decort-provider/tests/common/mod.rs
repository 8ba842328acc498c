//! Shared test support: a scripted, recording transport and a client
//! wired to it, so lifecycle flows can be driven end to end and their
//! exact call sequences asserted.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use decort_client::{
    AccessToken, Authenticator, ClientError, Config, DecortClient, Form, Transport,
    TransportResponse,
};
use decort_provider::{Api, ApiNamespace};

pub const BASE_URL: &str = "https://cloud.test";

/// One recorded exchange: the namespaced path and the form that was sent.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub form: Form,
}

/// Scripted transport. Responses are queued per path; the last queued
/// response for a path is sticky so repeated reads keep working.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<TransportResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, body: &str) {
        self.respond_status(path, 200, body);
    }

    pub fn respond_status(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(TransportResponse {
                status,
                body: body.to_string(),
            });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The recorded call paths, in order.
    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    /// All recorded calls to one path.
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    /// Index of the first call to `path`, if any.
    pub fn position_of(&self, path: &str) -> Option<usize> {
        self.paths().iter().position(|p| p == path)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_form(
        &self,
        url: &str,
        _bearer: Option<&str>,
        form: &Form,
    ) -> Result<TransportResponse, ClientError> {
        let path = url
            .split("/restmachine/")
            .nth(1)
            .unwrap_or(url)
            .to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.clone(),
            form: form.clone(),
        });

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) if queue.len() == 1 => Ok(queue.front().unwrap().clone()),
            _ => Ok(TransportResponse {
                status: 200,
                body: "true".to_string(),
            }),
        }
    }
}

struct StaticAuth;

#[async_trait]
impl Authenticator for StaticAuth {
    async fn login(&self, _transport: &dyn Transport) -> Result<AccessToken, ClientError> {
        Ok(AccessToken::new("test-token"))
    }
}

pub fn test_client(transport: Arc<MockTransport>) -> DecortClient {
    let config = Config::new(BASE_URL, "https://sso.test", "app", "secret").with_retries(0);
    DecortClient::new(config, transport, Arc::new(StaticAuth))
}

pub fn tenant_api(transport: Arc<MockTransport>) -> Api {
    Api::new(test_client(transport), ApiNamespace::Tenant)
}
