//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Server configuration options.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    /// Capacity of each participant's outbound queue. On overflow the
    /// oldest pending message is dropped.
    pub outbound_queue_capacity: usize,

    /// How long a freshly accepted socket may take to send its join
    /// frame before the server closes it.
    pub join_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            outbound_queue_capacity: 128,
            join_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom bind address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the outbound queue capacity.
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the join timeout.
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Build a config from the `HOST` and `PORT` environment variables,
    /// falling back to the defaults when unset.
    pub fn from_env() -> crate::error::Result<Self> {
        let host = std::env::var("HOST").ok();
        let port = std::env::var("PORT").ok();
        Ok(Self::default().bind(resolve_addr(host.as_deref(), port.as_deref())?))
    }
}

fn resolve_addr(host: Option<&str>, port: Option<&str>) -> crate::error::Result<SocketAddr> {
    let host: IpAddr = host.unwrap_or("0.0.0.0").parse()?;
    let port: u16 = port.unwrap_or("8000").parse()?;
    Ok(SocketAddr::new(host, port))
}
