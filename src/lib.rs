//! Dynamic bindings for the Linode API, synthesized from its published spec.
//!
//! Downloads the API spec (`api_action=api.spec`), turns every action into an
//! [`Operation`], and dispatches calls through a single validating
//! [`dispatch`] path. Nothing here is written per endpoint.
//!
//! # Usage
//!
//! ```no_run
//! use linode_api::{Args, Client};
//!
//! let mut client = Client::connect(None)?;
//! client.get_api_key("user", "secret")?;
//!
//! let linodes = client.invoke("linode_list", &Args::new())?;
//! println!("{}", linodes.data);
//! # Ok::<(), linode_api::Error>(())
//! ```

pub mod builder;
pub mod cli;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod spec;
pub mod transport;

pub use builder::{
    build_doc, operation_name, synthesize, Operation, OperationTable, BOOTSTRAP_ACTION,
};
pub use cli::{arg_name, build_commands, collect_args, dispatch_matches, find_operation, CliConfig};
pub use client::{operations, operations_with, Client, Credential, Endpoint, DEFAULT_BASE_URL};
pub use dispatch::{dispatch, Args, Dispatched, Envelope, ErrorRecord};
pub use error::{Error, SpecError, TransportError};
pub use spec::{fetch, parse_spec, ActionDescriptor, ApiSpec, ParameterDescriptor};
pub use transport::{HttpResponse, Transport};

// Re-export dependencies for downstream crates
pub use clap;
pub use reqwest;
