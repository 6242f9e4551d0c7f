pub mod agent_id;
pub mod control;
pub mod error;
pub mod message;
pub mod tls;
pub mod transport;
pub mod wire;

pub use agent_id::AgentId;
pub use error::{ClusterError, ClusterErrorKind};
pub use message::Frame;
pub use transport::Connection;
