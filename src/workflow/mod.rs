//! Election workflow: the engine, its event log and the shared service

pub mod election;
pub mod events;
pub mod service;

pub use election::{Election, ElectionSnapshot};
pub use events::{ElectionEvent, EventLog, EventRecord};
pub use service::ElectionService;
