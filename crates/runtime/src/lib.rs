//! Host process for the turn orchestrator
//!
//! Reads inbound events as JSON lines on stdin, routes them to per-session
//! coordinators, and writes outbound commands as JSON lines on stdout.
//! Logs go to stderr so stdout stays a clean command stream.

pub mod codec;
pub mod telemetry;

pub use codec::{decode_line, encode_command, CodecError, Envelope};
pub use telemetry::{init_metrics, init_tracing};
