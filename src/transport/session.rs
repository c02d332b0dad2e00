//! `reqwest`-backed transport with a lazily created, reused session.

use async_trait::async_trait;

use super::{HttpResponse, HttpTransport};
use crate::error::TransportError;
use crate::request::RequestSpec;

/// Production [`HttpTransport`] that keeps one `reqwest::Client` (and its
/// connection pool) for the whole polling lifetime.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    session: Option<reqwest::Client>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the first request has created the session.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> Result<&reqwest::Client, TransportError> {
        let client = match self.session.take() {
            Some(client) => client,
            None => {
                tracing::debug!("creating HTTP session");
                reqwest::Client::builder()
                    .user_agent(concat!("restpoll/", env!("CARGO_PKG_VERSION")))
                    .build()?
            }
        };
        Ok(self.session.insert(client))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&mut self, request: &RequestSpec) -> Result<HttpResponse, TransportError> {
        let client = self.session()?;
        let mut req = client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout);
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.options.body {
            req = req.json(body);
        }
        if let Some(token) = request
            .options
            .bearer_token
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            req = req.bearer_auth(token);
        }
        if let Some(auth) = &request.options.basic_auth {
            req = req.basic_auth(&auth.username, auth.password.as_deref());
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn close(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("closed HTTP session");
        }
    }
}
