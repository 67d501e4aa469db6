//! `OPER` grant/reject scenarios (`spec.md` §8 #6) and the `+O` self-grant
//! boundary behavior.

mod common;

use common::client::TestClient;
use common::server::TestServer;
use irc_server::config::OperCredential;

#[tokio::test]
async fn oper_with_correct_credentials_grants_operator_status() {
    let server = TestServer::start(vec![OperCredential {
        name: "test".to_string(),
        pw: "testpass".to_string(),
    }])
    .await;

    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    alice.send_raw("OPER test testpass").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply, ":example.com 381 alice :You are now an IRC operator");

    alice.send_raw("MODE alice").await.unwrap();
    let modes = alice.recv().await.unwrap();
    assert_eq!(modes, ":example.com 221 alice +O");
}

#[tokio::test]
async fn oper_with_wrong_password_is_rejected_and_leaves_modes_unchanged() {
    let server = TestServer::start(vec![OperCredential {
        name: "test".to_string(),
        pw: "testpass".to_string(),
    }])
    .await;

    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    alice.send_raw("OPER test wrongpass").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply, ":example.com 464 alice :Password incorrect");

    alice.send_raw("MODE alice").await.unwrap();
    let modes = alice.recv().await.unwrap();
    assert_eq!(modes, ":example.com 221 alice +");
}

#[tokio::test]
async fn a_user_cannot_grant_themselves_operator_via_mode() {
    let server = TestServer::start_plain().await;
    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    alice.send_raw("MODE alice +O").await.unwrap();
    // Rejected silently: no numeric, modes stay empty.
    alice.send_raw("MODE alice").await.unwrap();
    let modes = alice.recv().await.unwrap();
    assert_eq!(modes, ":example.com 221 alice +");
}
