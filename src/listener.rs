//! Listening socket setup and accept.
//!
//! The listener is created once at startup through a staged sequence
//! (create, set reuse-address, bind, listen); a failure at any stage
//! aborts startup with the failing stage attached. After `listen`
//! succeeds the socket accepts until the process ends.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::config::Config;
use crate::console::{error_line, Console, Stage};

const BACKLOG: i32 = 128;

/// The bound, listening socket. Accepting is the only operation after
/// setup; dropping the listener closes the socket.
#[derive(Debug)]
pub struct Listener {
    socket: TcpListener,
    host: String,
    port: u16,
}

impl Listener {
    /// Perform the one-time socket setup for `config.host:config.port`.
    pub fn bind(config: &Config) -> Result<Self, SetupError> {
        let addr = resolve(&config.host, config.port)?;

        let socket = Socket::new(
            match addr {
                SocketAddr::V4(_) => Domain::IPV4,
                SocketAddr::V6(_) => Domain::IPV6,
            },
            Type::STREAM,
            Some(Protocol::TCP),
        )
        .map_err(|e| SetupError::new(Stage::Create, e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| SetupError::new(Stage::SetOption, e))?;
        socket
            .bind(&addr.into())
            .map_err(|e| SetupError::new(Stage::Bind, e))?;
        socket
            .listen(BACKLOG)
            .map_err(|e| SetupError::new(Stage::Listen, e))?;

        Ok(Listener {
            socket: socket.into(),
            host: config.host.clone(),
            port: config.port,
        })
    }

    /// Emit the startup banner with the configured endpoint.
    pub fn announce<W: io::Write>(&self, console: &mut Console<W>) {
        console.line("Start server.");
        console.line(&format!("Host:{}", self.host));
        console.line(&format!("Port:{}", self.port));
    }

    /// Block until the next peer connects.
    pub fn accept_next(&self) -> Result<TcpStream, AcceptError> {
        let (stream, peer) = self
            .socket
            .accept()
            .map_err(|e| AcceptError { source: e })?;
        debug!(peer = %peer, "accepted connection");
        Ok(stream)
    }

    /// Actual bound address, for callers that bind port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

// Address resolution failures surface at the Bind stage, the stage that
// consumes the address.
fn resolve(host: &str, port: u16) -> Result<SocketAddr, SetupError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| SetupError::new(Stage::Bind, e))?
        .next()
        .ok_or_else(|| {
            SetupError::new(
                Stage::Bind,
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved"),
            )
        })
}

/// Fatal error during listener setup, tagged with the failing stage.
#[derive(Debug)]
pub struct SetupError {
    stage: Stage,
    source: io::Error,
}

impl SetupError {
    fn new(stage: Stage, source: io::Error) -> Self {
        SetupError { stage, source }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&error_line(self.stage, &self.source))
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Fatal error while accepting; terminates the whole server loop.
#[derive(Debug)]
pub struct AcceptError {
    source: io::Error,
}

impl std::fmt::Display for AcceptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&error_line(Stage::Accept, &self.source))
    }
}

impl std::error::Error for AcceptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
