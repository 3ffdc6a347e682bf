//! API sessions.
//!
//! Construction is two-phase: [`OperationTable::fetch`] (or [`operations`])
//! does the fallible, one-time spec download; [`Client::new`] then opens a
//! cheap session over the shared table.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::builder::{operation_name, Operation, OperationTable, BOOTSTRAP_ACTION};
use crate::dispatch::{dispatch, Args, Envelope};
use crate::error::Error;
use crate::transport::Transport;

/// Default base URL for the Linode API.
pub const DEFAULT_BASE_URL: &str = "https://api.linode.com/";

static OPERATIONS: OnceCell<Arc<OperationTable>> = OnceCell::new();

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Authentication state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    #[default]
    Anonymous,
    Authenticated(String),
}

impl Credential {
    /// An empty key is treated the same as no key.
    pub fn from_key(key: Option<String>) -> Self {
        match key {
            Some(key) if !key.is_empty() => Self::Authenticated(key),
            _ => Self::Anonymous,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(key) => Some(key),
        }
    }
}

/// The process-wide operation table for the default endpoint.
///
/// The spec is downloaded on first use only; concurrent first callers block
/// until that single download finishes. A failed download is not cached.
pub fn operations() -> Result<Arc<OperationTable>, Error> {
    operations_with(&OPERATIONS, &reqwest::blocking::Client::new(), &Endpoint::default())
}

/// Load `cell` from `endpoint` unless an earlier call already did.
///
/// Only the first successful fetch is kept; a failure leaves `cell` empty.
pub fn operations_with(
    cell: &OnceCell<Arc<OperationTable>>,
    transport: &impl Transport,
    endpoint: &Endpoint,
) -> Result<Arc<OperationTable>, Error> {
    cell.get_or_try_init(|| OperationTable::fetch(transport, endpoint).map(Arc::new))
        .cloned()
}

/// A session against the API.
///
/// All sessions built from the same table share its operations; each holds
/// its own credential.
#[derive(Debug)]
pub struct Client<T = reqwest::blocking::Client> {
    operations: Arc<OperationTable>,
    transport: T,
    endpoint: Endpoint,
    credential: Credential,
}

impl Client {
    /// Open a session using the default HTTP client and endpoint.
    pub fn new(operations: Arc<OperationTable>, api_key: Option<String>) -> Self {
        Self::with_transport(operations, reqwest::blocking::Client::new(), api_key)
    }

    /// Open a session over the process-wide operation table, fetching the
    /// spec if no session has done so yet.
    pub fn connect(api_key: Option<String>) -> Result<Self, Error> {
        Ok(Self::new(operations()?, api_key))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(
        operations: Arc<OperationTable>,
        transport: T,
        api_key: Option<String>,
    ) -> Self {
        Self {
            operations,
            transport,
            endpoint: Endpoint::default(),
            credential: Credential::from_key(api_key),
        }
    }

    /// Send requests to `endpoint` instead of the default.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn api_key(&self) -> Option<&str> {
        self.credential.key()
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.credential = Credential::from_key(api_key);
    }

    pub fn operations(&self) -> &OperationTable {
        &self.operations
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Help text of an operation.
    pub fn help(&self, name: &str) -> Option<&str> {
        self.operation(name).map(|op| op.doc.as_str())
    }

    /// Invoke the operation called `name`.
    ///
    /// Returns the whole response envelope. A successful `user_getapikey`
    /// call also stores the issued key on this client.
    pub fn invoke(&mut self, name: &str, args: &Args) -> Result<Envelope, Error> {
        let op = self
            .operations
            .get(name)
            .ok_or_else(|| Error::UnknownOperation {
                name: name.to_string(),
            })?;

        let out = dispatch(
            &self.transport,
            self.endpoint.base_url(),
            self.credential.key(),
            op,
            args,
        )?;

        if let Some(key) = out.issued_key {
            self.credential = Credential::Authenticated(key);
        }

        Ok(out.envelope)
    }

    /// Authenticate with account credentials and keep the issued API key.
    pub fn get_api_key(&mut self, username: &str, password: &str) -> Result<Envelope, Error> {
        let mut args = Args::new();
        args.insert("username".into(), Value::String(username.to_string()));
        args.insert("password".into(), Value::String(password.to_string()));
        self.invoke(&operation_name(BOOTSTRAP_ACTION), &args)
    }
}
