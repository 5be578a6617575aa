pub mod actor;
pub mod address;
pub mod agent;
pub mod job;
pub mod payment;
pub mod sender;
pub mod view;
