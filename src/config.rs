use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default MPD port.
pub const DEFAULT_PORT: u16 = 6600;

/// Settings read when the server starts and whenever a service is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    /// Clients start without any permission while a password is set.
    pub password: Option<String>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            password: None,
        }
    }
}
