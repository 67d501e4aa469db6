//! Raw-socket test client.
//!
//! Grounded in `manuelpont94-irc/src/bin/irc_client_tests.rs`'s style: a
//! bare `TcpStream`, `Box<dyn Error>` instead of a dependency on `anyhow`
//! (which is not part of the teacher's stack), and line-oriented
//! read/write rather than a typed command enum.

use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::time::timeout;

type BoxError = Box<dyn Error + Send + Sync>;

/// A client connection to a [`super::server::TestServer`].
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: &str) -> Result<Self, BoxError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(TestClient {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Sends a raw line, appending CRLF if the caller omitted it.
    pub async fn send_raw(&mut self, line: &str) -> Result<(), BoxError> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        Ok(())
    }

    /// Reads one CRLF-terminated line, with its trailing CRLF stripped.
    pub async fn recv(&mut self) -> Result<String, BoxError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err("connection closed".into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Like [`Self::recv`], but fails instead of hanging forever if nothing
    /// arrives within `dur`.
    pub async fn recv_timeout(&mut self, dur: Duration) -> Result<String, BoxError> {
        timeout(dur, self.recv()).await?
    }

    /// Reads lines until one contains `needle`, returning it. Used to skip
    /// past burst lines (MOTD body, ISUPPORT) a test doesn't care about.
    pub async fn recv_until(&mut self, needle: &str) -> Result<String, BoxError> {
        loop {
            let line = self.recv_timeout(Duration::from_secs(2)).await?;
            if line.contains(needle) {
                return Ok(line);
            }
        }
    }

    /// Registers with the given nick/username and drains the welcome burst
    /// (001 through 004, RPL_ISUPPORT, and the MOTD sequence) up to and
    /// including RPL_ENDOFMOTD (376).
    pub async fn register(&mut self, nick: &str, username: &str) -> Result<(), BoxError> {
        self.send_raw(&format!("NICK {nick}")).await?;
        self.send_raw(&format!("USER {username} 0 * :{username} Test")).await?;
        self.recv_until(" 376 ").await?;
        Ok(())
    }
}
