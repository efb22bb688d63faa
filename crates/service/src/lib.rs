//! JSON-RPC facade for the execution adapter.
//!
//! [`start_server`] exposes any [`evm_exec::Execution`] under the `execution_`
//! namespace; [`RemoteExecution`] is the matching client and implements the
//! same trait, so a chain driver can use either interchangeably.

#![warn(missing_docs)]

pub mod api;
pub mod error;
mod remote;
mod server;

pub use api::{ExecutionApiClient, ExecutionApiServer};
pub use remote::RemoteExecution;
pub use server::{start_server, ExecutionRpc};
