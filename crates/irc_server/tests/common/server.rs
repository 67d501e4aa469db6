//! In-process test server harness.
//!
//! `examples/sid3xyz-slircd-ng`'s own `tests/common/server.rs` spawns a
//! pre-built binary as a subprocess; no build step ever runs here, so there
//! is nothing to spawn. Instead this binds an ephemeral loopback port and
//! hands it straight to `irc_server::server::accept_loop`, the same accept
//! loop `bin/irc_server.rs` runs in production (see `DESIGN.md`).

use std::sync::Arc;

use irc_server::config::{Config, LimitsConfig, OperCredential};
use irc_server::registry::Registry;
use tokio::net::TcpListener;

/// A running test server bound to an ephemeral `127.0.0.1` port.
pub struct TestServer {
    pub addr: String,
}

impl TestServer {
    /// Starts a server with the given operator credentials configured and
    /// returns a handle carrying its bound address. The accept loop runs
    /// in a detached task for the lifetime of the test process.
    pub async fn start(opers: Vec<OperCredential>) -> Self {
        let config = Config {
            hostname: "example.com".to_string(),
            port: 0,
            netname: "ExampleNet".to_string(),
            info: "An example IRC server".to_string(),
            motd: "line one\nline two".to_string(),
            opers,
            allowed_links: Vec::new(),
            limits: LimitsConfig::default(),
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("binding an ephemeral loopback port should never fail");
        let addr = listener.local_addr().unwrap().to_string();

        let registry = Arc::new(Registry::new(config));
        tokio::spawn(irc_server::server::accept_loop(registry, listener));

        TestServer { addr }
    }

    pub async fn start_plain() -> Self {
        Self::start(Vec::new()).await
    }
}
