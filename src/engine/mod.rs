pub mod authorization;
pub mod dispatch;
pub mod handshake;
pub mod lifecycle;
pub mod matching;
pub mod notify;
pub mod reschedule;
