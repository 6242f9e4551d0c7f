pub mod health;
pub mod mediator;
pub mod membership;
pub mod partition;

pub use mediator::Mediator;
