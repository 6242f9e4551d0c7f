pub mod agent;
pub mod fs_writer;
pub mod pipeline;
pub mod register;

pub use agent::ScribeAgent;
