//! Port traits (interfaces) for the backend calls
//!
//! The core never talks HTTP itself; the CLI plugs in a reqwest adapter and
//! tests plug in scripted in-memory backends.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use codeforge_types::{
    ExecuteRequest, GenerateRequest, GenerateResponse, TerminalRequest, TerminalResponse,
};
use futures::stream::BoxStream;

/// Raw response body of the execution call, chunked as the transport delivers it
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// Prompt -> assistant message (+ optional artifact)
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateResponse, TransportError>;
}

/// Submits an action list; resolves once response headers arrive
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn submit(&self, request: &ExecuteRequest)
        -> std::result::Result<ByteStream, TransportError>;
}

/// Runs one command in the session's sandbox
#[async_trait]
pub trait TerminalBackend: Send + Sync {
    async fn run_command(
        &self,
        request: &TerminalRequest,
    ) -> std::result::Result<TerminalResponse, TransportError>;
}
