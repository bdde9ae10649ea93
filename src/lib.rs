pub mod ack;
pub mod cmd;
pub mod config;
pub mod frame;
pub mod parser;
pub mod permission;
pub mod player;
pub mod tags;

pub use cmd::Registry;
pub use config::Config;
pub use frame::LineBuffer;
pub use parser::parse_command;
pub use player::{MemoryPlayer, Player, PlayerEvent, Track};

pub mod connection;
pub use connection::{Connection, ConnectionId};

pub mod outbox;
pub mod service;
pub use service::Service;

pub mod server;
pub use server::Server;

pub mod shutdown;
