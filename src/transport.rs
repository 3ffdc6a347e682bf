//! Blocking HTTP transport seam.
//!
//! Everything the crate needs from the network is a single capability:
//! perform a GET with query parameters and hand back status + body.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::TransportError;

/// A fully received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON, rejecting non-2xx responses first.
    pub fn json(self) -> Result<Value, TransportError> {
        if !self.status.is_success() {
            return Err(TransportError::HttpError {
                status: self.status,
                body: self.body,
            });
        }

        serde_json::from_str(&self.body).map_err(TransportError::InvalidJson)
    }
}

/// Performs one blocking GET round trip.
pub trait Transport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

impl Transport for reqwest::blocking::Client {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        let mut req = reqwest::blocking::Client::get(self, url);
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req.send().map_err(TransportError::RequestFailed)?;
        let status = resp.status();
        let body = resp.text().map_err(TransportError::ResponseRead)?;

        Ok(HttpResponse { status, body })
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        (**self).get(url, query)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// A recorded request: URL plus query pairs.
    pub(crate) type Recorded = (String, Vec<(String, String)>);

    /// Replays canned responses and counts calls.
    #[derive(Debug, Default)]
    pub(crate) struct StubTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        requests: RefCell<Vec<Recorded>>,
    }

    impl StubTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(self, status: u16, body: Value) -> Self {
            self.respond_raw(status, body.to_string())
        }

        pub(crate) fn respond_raw(self, status: u16, body: impl Into<String>) -> Self {
            let status = StatusCode::from_u16(status).unwrap();
            self.responses
                .borrow_mut()
                .push_back(HttpResponse::new(status, body));
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.borrow().len()
        }

        pub(crate) fn last_request(&self) -> Recorded {
            self.requests.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for StubTransport {
        fn get(
            &self,
            url: &str,
            query: &[(String, String)],
        ) -> Result<HttpResponse, TransportError> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), query.to_vec()));
            let resp = self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("stub transport ran out of responses");
            Ok(resp)
        }
    }
}
