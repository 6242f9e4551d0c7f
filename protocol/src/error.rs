//! Cluster-wide error taxonomy, shared by Scribe and Mediator.
//!
//! Four kinds, matching the propagation policy: `Configuration` and bind
//! failures are fatal at startup; `Transient` triggers eviction or retry;
//! `Disk` is logged and the offending request dropped; `Protocol` gets an
//! error ack but the connection keeps serving.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ClusterErrorKind {
    Configuration,
    Transient,
    Disk,
    Protocol,
}

#[derive(Debug)]
pub struct ClusterError {
    pub kind: ClusterErrorKind,
    pub description: String,
    pub module: &'static str,
}

impl ClusterError {
    pub fn new(kind: ClusterErrorKind, description: impl Into<String>, module: &'static str) -> Self {
        ClusterError {
            kind,
            description: description.into(),
            module,
        }
    }

    pub fn configuration(description: impl Into<String>, module: &'static str) -> Self {
        Self::new(ClusterErrorKind::Configuration, description, module)
    }

    pub fn transient(description: impl Into<String>, module: &'static str) -> Self {
        Self::new(ClusterErrorKind::Transient, description, module)
    }

    pub fn disk(description: impl Into<String>, module: &'static str) -> Self {
        Self::new(ClusterErrorKind::Disk, description, module)
    }

    pub fn protocol(description: impl Into<String>, module: &'static str) -> Self {
        Self::new(ClusterErrorKind::Protocol, description, module)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ClusterErrorKind::Configuration)
    }
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] ({}): {}", self.kind, self.module, self.description)
    }
}

impl std::error::Error for ClusterError {}

impl From<io::Error> for ClusterError {
    fn from(e: io::Error) -> Self {
        ClusterError::disk(e.to_string(), "io")
    }
}
