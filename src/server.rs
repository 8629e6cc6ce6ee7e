//! Accept loop wiring the listener to sessions.
//!
//! Strictly sequential: the server accepts a connection, runs its session
//! to completion, then returns to accept the next one. A second client
//! queues in the OS backlog until the current session ends.

use std::io::Write;

use tracing::{error, info};

use crate::config::Config;
use crate::console::Console;
use crate::listener::{AcceptError, Listener, SetupError};
use crate::session::Session;

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Server { config }
    }

    /// Bind the listener, print the startup banner, and serve until a
    /// fatal error.
    ///
    /// The stage-labelled diagnostic line has already been written to the
    /// operator console when this returns an error.
    pub fn run(&self) -> Result<(), ServerError> {
        let mut console = Console::stdout();

        let listener = match Listener::bind(&self.config) {
            Ok(listener) => listener,
            Err(err) => {
                console.line(&err.to_string());
                return Err(ServerError::Setup(err));
            }
        };

        listener.announce(&mut console);
        info!(host = %self.config.host, port = self.config.port, "server listening");

        self.serve(listener, &mut console)
    }

    /// The accept loop itself, parameterized over the console sink so
    /// tests can drive a port-0 listener and capture operator output.
    pub fn serve<W: Write>(
        &self,
        listener: Listener,
        console: &mut Console<W>,
    ) -> Result<(), ServerError> {
        loop {
            let stream = match listener.accept_next() {
                Ok(stream) => stream,
                Err(err) => {
                    error!(error = %err, "accept failed");
                    console.line(&err.to_string());
                    return Err(ServerError::Accept(err));
                }
            };

            Session::new(stream, &self.config).run(console);
        }
    }
}

/// Fatal server errors: either listener setup or accept failed.
#[derive(Debug)]
pub enum ServerError {
    Setup(SetupError),
    Accept(AcceptError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Setup(e) => std::fmt::Display::fmt(e, f),
            ServerError::Accept(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Setup(e) => Some(e),
            ServerError::Accept(e) => Some(e),
        }
    }
}

impl From<SetupError> for ServerError {
    fn from(err: SetupError) -> Self {
        ServerError::Setup(err)
    }
}

impl From<AcceptError> for ServerError {
    fn from(err: AcceptError) -> Self {
        ServerError::Accept(err)
    }
}
