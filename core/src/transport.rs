//! Blocking HTTP transport backed by ureq.

use tracing::debug;
use ureq::http::{HeaderName, HeaderValue};

use crate::error::HarnessError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Sends each request exactly once with the transport's default timeouts.
///
/// ureq's status-code-as-error behavior is disabled, so 4xx/5xx responses
/// come back as data and the caller's declared expectation decides.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HarnessError> {
        let url = request.path.as_str();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            HttpMethod::Post => {
                send_body(with_headers(self.agent.post(url), &request.headers), request)
            }
            HttpMethod::Put => {
                send_body(with_headers(self.agent.put(url), &request.headers), request)
            }
        };
        let mut response = result.map_err(|e| HarnessError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().iter().map(header_entry).collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| HarnessError::Transport(e.to_string()))?;

        debug!(method = request.method.as_str(), url, status, "http exchange");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Header values are not guaranteed to be ASCII; non-UTF-8 bytes are
/// replaced rather than dropping the whole value.
fn header_entry((name, value): (&HeaderName, &HeaderValue)) -> (String, String) {
    (
        name.as_str().to_string(),
        String::from_utf8_lossy(value.as_bytes()).into_owned(),
    )
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
