//! Per-connection request/response loop.
//!
//! A session owns one accepted connection and drives it until the client
//! sends `close` or disconnects. Read, write, and peer-name failures are
//! reported to the operator and the loop keeps going; only `close` and
//! peer disconnect end it. The stream is closed when the session returns.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use tracing::{trace, warn};

use crate::config::Config;
use crate::console::{self, Console, Stage};
use crate::protocol::{dispatch, normalize, Command};

/// One accepted connection and its loop state.
pub struct Session {
    stream: TcpStream,
    max_read_bytes: usize,
    read_timeout: Option<std::time::Duration>,
}

impl Session {
    pub fn new(stream: TcpStream, config: &Config) -> Self {
        Session {
            stream,
            max_read_bytes: config.max_read_bytes,
            read_timeout: config.read_timeout,
        }
    }

    /// Run the read-dispatch-respond loop to completion.
    pub fn run<W: Write>(self, console: &mut Console<W>) {
        if let Err(err) = self.stream.set_read_timeout(self.read_timeout) {
            warn!(error = %err, "failed to apply read deadline");
        }

        let mut reader = BufReader::new(&self.stream);
        let mut line = String::new();

        loop {
            line.clear();

            // Line-oriented read, stopping at a newline or at the
            // configured byte limit, whichever comes first.
            let n = match (&mut reader)
                .take(self.max_read_bytes as u64)
                .read_line(&mut line)
            {
                Ok(n) => n,
                Err(err) => {
                    warn!(error = %err, "read failed");
                    console.report(Stage::Read, &err);
                    continue;
                }
            };
            if n == 0 {
                trace!("peer disconnected");
                break;
            }

            let message = normalize(&line);
            if message.is_empty() {
                continue;
            }
            console.inbound(&message);

            let command = Command::parse(&message);
            trace!(?command, "dispatching");
            let response = self.respond(command, console);
            console.outbound(&response);

            if let Err(err) = (&self.stream).write_all(&console::frame(&response)) {
                warn!(error = %err, "write failed");
                console.report(Stage::Write, &err);
            }

            if command == Command::Close {
                break;
            }
        }
        // Dropping self closes the stream.
    }

    // Resolve the peer address when `whoami` needs it, then run the pure
    // dispatch. A failed lookup is reported and falls back to None.
    fn respond<W: Write>(&self, command: Command, console: &mut Console<W>) -> String {
        let peer = match command {
            Command::Whoami => match self.stream.peer_addr() {
                Ok(addr) => Some(addr),
                Err(err) => {
                    warn!(error = %err, "peer name lookup failed");
                    console.report(Stage::PeerName, &err);
                    None
                }
            },
            _ => None,
        };
        dispatch(command, peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Accept one connection on an ephemeral port, run a session over it
    /// on a background thread, and hand the client stream back. Joining
    /// the handle yields the captured operator console output.
    fn start_session(config: Config) -> (TcpStream, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut console = Console::new(Vec::new());
            Session::new(stream, &config).run(&mut console);
            String::from_utf8(console.into_inner()).unwrap()
        });

        (TcpStream::connect(addr).unwrap(), handle)
    }

    fn request(client: &mut TcpStream, line: &str) -> String {
        client.write_all(line.as_bytes()).unwrap();
        let mut response = String::new();
        BufReader::new(client.try_clone().unwrap())
            .read_line(&mut response)
            .unwrap();
        response
    }

    #[test]
    fn test_connect_then_close() {
        let (mut client, handle) = start_session(Config::default());

        assert_eq!(request(&mut client, "connect\n"), "OK\n");
        assert_eq!(request(&mut client, "close\n"), "OK\n");

        // Server side closed after the close response.
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());

        let echoed = handle.join().unwrap();
        assert_eq!(echoed, "<<< connect\n>>> OK\n<<< close\n>>> OK\n");
    }

    #[test]
    fn test_whoami_reports_peer_address() {
        let (mut client, handle) = start_session(Config::default());
        let expected = format!("{}\n", client.local_addr().unwrap());

        assert_eq!(request(&mut client, "whoami\n"), expected);
        assert_eq!(request(&mut client, "  WhoAmI  \n"), expected);

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn test_unknown_command_gets_help() {
        let (mut client, handle) = start_session(Config::default());

        assert_eq!(
            request(&mut client, "ping\n"),
            "What you mean? Use: connect|whoami|close\n"
        );

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (mut client, handle) = start_session(Config::default());

        // Blank and whitespace-only lines draw no response; the next
        // real command is answered first.
        assert_eq!(request(&mut client, "\n   \nconnect\n"), "OK\n");

        drop(client);
        let echoed = handle.join().unwrap();
        assert_eq!(echoed, "<<< connect\n>>> OK\n");
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (mut client, handle) = start_session(Config::default());

        for _ in 0..3 {
            assert_eq!(request(&mut client, "connect\n"), "OK\n");
        }

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn test_disconnect_ends_session() {
        let (client, handle) = start_session(Config::default());
        drop(client);

        let echoed = handle.join().unwrap();
        assert_eq!(echoed, "");
    }
}
