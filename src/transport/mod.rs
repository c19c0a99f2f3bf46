pub mod client;
pub mod hub;
pub mod ws_session;
