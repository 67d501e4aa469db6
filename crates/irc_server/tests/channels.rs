//! JOIN/PART/PRIVMSG channel scenarios (`spec.md` §8 #3-#5 and boundary
//! behaviors).

mod common;

use common::client::TestClient;
use common::server::TestServer;
use std::time::Duration;

#[tokio::test]
async fn join_then_privmsg_excludes_only_the_sender() {
    let server = TestServer::start_plain().await;

    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();
    let mut bob = TestClient::connect(&server.addr).await.unwrap();
    bob.register("bob", "bob").await.unwrap();

    alice.send_raw("JOIN #lobby").await.unwrap();
    // Alice is alone: drain her own JOIN echo plus the TOPIC/NAMES burst
    // that follows it, ending on RPL_ENDOFNAMES (366).
    alice.recv_until("366").await.unwrap();

    bob.send_raw("JOIN #lobby").await.unwrap();
    // Alice sees Bob's JOIN broadcast (she is still a member).
    let bob_join = alice.recv().await.unwrap();
    assert_eq!(bob_join, ":bob!bob@127.0.0.1 JOIN #lobby");

    alice.send_raw("PRIVMSG #lobby :hi").await.unwrap();

    let bob_recv = bob.recv_until("PRIVMSG #lobby").await.unwrap();
    assert_eq!(bob_recv, ":alice!alice@127.0.0.1 PRIVMSG #lobby :hi");

    // Alice must not receive her own PRIVMSG back.
    let alice_next = alice.recv_timeout(Duration::from_millis(300)).await;
    assert!(alice_next.is_err(), "sender should not see its own PRIVMSG echoed back");
}

#[tokio::test]
async fn wrong_key_is_rejected_with_475() {
    let server = TestServer::start_plain().await;

    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();
    alice.send_raw("JOIN #vault").await.unwrap();
    alice.recv_until("JOIN #vault").await.unwrap();
    alice.send_raw("MODE #vault +k secret").await.unwrap();

    let mut bob = TestClient::connect(&server.addr).await.unwrap();
    bob.register("bob", "bob").await.unwrap();
    bob.send_raw("JOIN #vault wrong").await.unwrap();

    let reply = bob.recv().await.unwrap();
    assert_eq!(reply, ":example.com 475 bob #vault :Cannot join channel (+k)");
}

#[tokio::test]
async fn full_channel_is_rejected_with_471() {
    let server = TestServer::start_plain().await;

    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();
    alice.send_raw("JOIN #small").await.unwrap();
    alice.recv_until("JOIN #small").await.unwrap();
    alice.send_raw("MODE #small +l 1").await.unwrap();

    let mut bob = TestClient::connect(&server.addr).await.unwrap();
    bob.register("bob", "bob").await.unwrap();
    bob.send_raw("JOIN #small").await.unwrap();

    let reply = bob.recv().await.unwrap();
    assert_eq!(reply, ":example.com 471 bob #small :Cannot join channel (+l)");
}

#[tokio::test]
async fn rejoining_an_already_joined_channel_is_a_silent_no_op() {
    let server = TestServer::start_plain().await;
    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    alice.send_raw("JOIN #lobby").await.unwrap();
    alice.recv_until("366").await.unwrap(); // end of NAMES for the first JOIN

    alice.send_raw("JOIN #lobby").await.unwrap();
    // Nothing further should arrive for the duplicate JOIN; PING/PONG is
    // used as a synchronization barrier to prove the queue stayed empty.
    alice.send_raw("PING :sync").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply, "PONG :sync");
}

#[tokio::test]
async fn part_of_a_non_member_channel_sends_err_not_on_channel() {
    let server = TestServer::start_plain().await;
    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();
    let mut bob = TestClient::connect(&server.addr).await.unwrap();
    bob.register("bob", "bob").await.unwrap();

    alice.send_raw("JOIN #lobby").await.unwrap();
    alice.recv_until("366").await.unwrap();

    bob.send_raw("PART #lobby").await.unwrap();
    let reply = bob.recv().await.unwrap();
    assert_eq!(reply, ":example.com 442 bob #lobby :You're not on that channel");

    // And Alice, the sole real member, saw no PART broadcast.
    alice.send_raw("PING :sync").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply, "PONG :sync");
}

#[tokio::test]
async fn channel_name_over_32_chars_is_rejected_with_bad_chan_mask() {
    let server = TestServer::start_plain().await;
    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    let too_long = format!("#{}", "a".repeat(32));
    alice.send_raw(&format!("JOIN {too_long}")).await.unwrap();

    let reply = alice.recv().await.unwrap();
    assert_eq!(reply, format!(":example.com 476 alice {too_long} :Bad Channel Mask"));
}

#[tokio::test]
async fn join_then_part_on_a_fresh_channel_leaves_no_trace() {
    let server = TestServer::start_plain().await;
    let mut alice = TestClient::connect(&server.addr).await.unwrap();
    alice.register("alice", "alice").await.unwrap();

    alice.send_raw("JOIN #ephemeral").await.unwrap();
    alice.recv_until("366").await.unwrap();
    alice.send_raw("PART #ephemeral").await.unwrap();
    alice.recv_until("PART #ephemeral").await.unwrap();

    // A second JOIN recreates the channel as a fresh one: Alice becomes its
    // op again (the 'n'/'t' defaults aren't asserted here, just that this
    // round-trips without leftover membership/mode state from before).
    alice.send_raw("JOIN #ephemeral").await.unwrap();
    let join_echo = alice.recv().await.unwrap();
    assert_eq!(join_echo, ":alice!alice@127.0.0.1 JOIN #ephemeral");
}
