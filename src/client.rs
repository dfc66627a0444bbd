mod auth;
mod connection;
mod connector;
mod lock;
mod messages;
mod receiver;

pub use connection::VncConnection;
pub use connector::VncConnector;
