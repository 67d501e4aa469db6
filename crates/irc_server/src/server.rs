//! The accept loop and per-connection task pair (reader + writer).
//!
//! This is the "transport acceptor and per-connection I/O loop" `spec.md`
//! §1 names as an external collaborator of the core, out of the core's own
//! scope. It is kept in the library rather than inlined into
//! `bin/irc_server.rs` so that integration tests can bind an ephemeral
//! loopback port and drive a real `Registry` over real sockets without
//! spawning a separate process — `manuelpont94-irc`'s own stress-test bin
//! (`src/bin/irc_client_tests.rs`) drives a server the same way, over a raw
//! `TcpStream`, just against a separately-running process.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::connection::{Connection, ConnectionState, OUTBOUND_CHANNEL_SIZE};
use crate::handlers;
use crate::message::Message;
use crate::registry::Registry;

/// Accepts connections on `listener` forever, spawning one task pair per
/// client. Returns only if `accept` itself fails fatally (it never does on
/// a live `TcpListener`; kept as a loop rather than `loop {}` so a caller
/// embedding this in a larger supervisor tree can still see an `Err`).
pub async fn accept_loop(registry: Arc<Registry>, listener: TcpListener) {
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("accept failed: {e}");
                continue;
            }
        };
        let registry = registry.clone();
        tokio::spawn(async move {
            handle_connection(registry, socket, addr).await;
        });
    }
}

/// Drives one client connection from accept to close: a reader loop that
/// parses CRLF-framed lines and dispatches them, plus a writer task that
/// drains the connection's outbound queue strictly in send order.
pub async fn handle_connection(registry: Arc<Registry>, socket: TcpStream, addr: SocketAddr) {
    let unique_id = registry.new_connection_id();
    let remote_host = addr.ip().to_string();
    info!("conn {unique_id}: connected from {remote_host}");

    let (read_half, mut write_half) = socket.into_split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CHANNEL_SIZE);

    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = write_half.write_all(line.as_bytes()).await {
                error!("conn {unique_id}: write failed: {e}");
                break;
            }
        }
    });

    let mut conn = Connection::new(unique_id, remote_host, tx);
    let mut lines = BufReader::new(read_half).lines();

    let mut read_failed = false;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("conn {unique_id}: read failed: {e}");
                read_failed = true;
                break;
            }
        };

        match Message::parse(&line) {
            Ok(msg) => handlers::dispatch(&registry, &mut conn, msg),
            Err(_) => warn!("conn {unique_id}: dropped malformed line"),
        }

        if conn.state == ConnectionState::Closed {
            break;
        }
    }

    // A `QUIT` already ran `quit_user` and moved `conn.state` to `Closed`
    // (so `is_registered` is false below). Of the remaining unannounced
    // disconnects, a fatal socket read error gets "Internet Server Error";
    // clean EOF or a server-initiated close get "Connection Lost".
    if conn.is_registered() {
        let reason = if read_failed { "Internet Server Error" } else { "Connection Lost" };
        registry.quit_user(unique_id, Some(reason));
    }

    drop(conn);
    let _ = writer.await;
    info!("conn {unique_id}: disconnected");
}
