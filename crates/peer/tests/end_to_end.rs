//! Full-stack exercises: a real rendezvous server on a loopback socket,
//! two sessions handshaking through it, then chat and file traffic over
//! the opened channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use xdrop_peer::loopback;
use xdrop_peer::{
    PeerEvent, PeerSession, PollConfig, RendezvousClient, RendezvousError, SendOptions,
    SessionError, SessionState,
};
use xdrop_protocol::{ChatKind, Direction};
use xdrop_rendezvous::{SlotStore, serve};

async fn start_server() -> (String, CancellationToken) {
    let store = Arc::new(SlotStore::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    tokio::spawn(serve(store, listener, cancel.clone()));
    (format!("http://{addr}"), cancel)
}

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(20),
        timeout: Some(Duration::from_secs(10)),
    }
}

async fn next_event(rx: &mut mpsc::Receiver<PeerEvent>) -> PeerEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no event within 10s")
        .expect("event stream ended")
}

async fn wait_for_token(rx: &mut mpsc::Receiver<PeerEvent>) -> String {
    loop {
        if let PeerEvent::SessionCreated { token } = next_event(rx).await {
            return token;
        }
    }
}

#[tokio::test]
async fn two_peers_connect_chat_and_transfer() {
    let (base, _server) = start_server().await;
    let (ep_a, ep_b) = loopback::pair();

    let (session_a, mut events_a) = PeerSession::new(&base, fast_poll());
    let (session_b, mut events_b) = PeerSession::new(&base, fast_poll());

    let initiator = tokio::spawn({
        let session = Arc::clone(&session_a);
        async move { session.connect_as_initiator(&ep_a).await }
    });

    // The token is published mid-handshake so the responder can join.
    let token = wait_for_token(&mut events_a).await;
    session_b.connect_as_responder(&token, &ep_b).await.unwrap();
    let returned = initiator.await.unwrap().unwrap();
    assert_eq!(returned, token);

    assert_eq!(session_a.state(), SessionState::Open);
    assert_eq!(session_b.state(), SessionState::Open);

    let ch_a = session_a.channel().unwrap();
    let ch_b = session_b.channel().unwrap();

    // Chat, both directions, with URL classification.
    ch_a.send_message("hello from a").await.unwrap();
    loop {
        if let PeerEvent::Message(msg) = next_event(&mut events_b).await {
            if msg.direction == Direction::In {
                assert_eq!(msg.text, "hello from a");
                assert_eq!(msg.kind, ChatKind::Text);
                break;
            }
        }
    }
    ch_b.send_message("www.example.com").await.unwrap();
    loop {
        if let PeerEvent::Message(msg) = next_event(&mut events_a).await {
            if msg.direction == Direction::In {
                assert_eq!(msg.kind, ChatKind::Url);
                break;
            }
        }
    }

    // A file, reassembled byte for byte.
    let data: Vec<u8> = (0..100_000_u32).map(|i| (i.wrapping_mul(31) % 251) as u8).collect();
    let item = ch_a
        .send_bytes("holiday.jpg", &data, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(item.transferred, data.len() as u64);

    loop {
        match next_event(&mut events_b).await {
            PeerEvent::FileReceived { item, bytes } => {
                assert_eq!(item.name, "holiday.jpg");
                assert_eq!(bytes, data);
                break;
            }
            PeerEvent::Transfer(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn connect_while_open_is_rejected() {
    let (base, _server) = start_server().await;
    let (ep_a, ep_b) = loopback::pair();

    let (session_a, mut events_a) = PeerSession::new(&base, fast_poll());
    let (session_b, _events_b) = PeerSession::new(&base, fast_poll());

    let initiator = tokio::spawn({
        let session = Arc::clone(&session_a);
        async move { session.connect_as_initiator(&ep_a).await }
    });
    let token = wait_for_token(&mut events_a).await;
    session_b.connect_as_responder(&token, &ep_b).await.unwrap();
    initiator.await.unwrap().unwrap();

    let (ep_a2, _ep_b2) = loopback::pair();
    let err = session_a.connect_as_initiator(&ep_a2).await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyActive));
}

#[tokio::test]
async fn close_moves_to_closed_and_kills_channel() {
    let (base, _server) = start_server().await;
    let (ep_a, ep_b) = loopback::pair();

    let (session_a, mut events_a) = PeerSession::new(&base, fast_poll());
    let (session_b, _events_b) = PeerSession::new(&base, fast_poll());

    let initiator = tokio::spawn({
        let session = Arc::clone(&session_a);
        async move { session.connect_as_initiator(&ep_a).await }
    });
    let token = wait_for_token(&mut events_a).await;
    session_b.connect_as_responder(&token, &ep_b).await.unwrap();
    initiator.await.unwrap().unwrap();

    let ch_b = session_b.channel().unwrap();
    session_a.close();
    assert_eq!(session_a.state(), SessionState::Closed);
    assert!(matches!(
        session_a.channel(),
        Err(SessionError::NotConnected)
    ));

    // The transport pair is torn down as a unit; b's sends start failing.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if ch_b.send_message("anyone?").await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("b never observed the close");
}

#[tokio::test]
async fn responder_poll_times_out_without_offer() {
    let (base, _server) = start_server().await;
    let client = RendezvousClient::new(&base);
    let token = client.create_session().await.unwrap();

    let cfg = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Some(Duration::from_millis(100)),
    };
    let cancel = CancellationToken::new();
    let err = client.wait_offer(&token, &cfg, &cancel).await.unwrap_err();
    assert!(matches!(err, RendezvousError::Timeout));
}

#[tokio::test]
async fn poll_cancellation_is_distinct_from_timeout() {
    let (base, _server) = start_server().await;
    let client = RendezvousClient::new(&base);
    let token = client.create_session().await.unwrap();

    let cfg = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Some(Duration::from_secs(30)),
    };
    let cancel = CancellationToken::new();
    let waiter = tokio::spawn({
        let cancel = cancel.clone();
        async move { client.wait_answer(&token, &cfg, &cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, RendezvousError::Cancelled));
}

#[tokio::test]
async fn unknown_token_fails_fast() {
    let (base, _server) = start_server().await;
    let client = RendezvousClient::new(&base);

    let cancel = CancellationToken::new();
    let err = client
        .wait_offer("999999", &fast_poll(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RendezvousError::NotFound));
}

#[tokio::test]
async fn consumed_session_conflicts() {
    let (base, _server) = start_server().await;
    let client = RendezvousClient::new(&base);

    let token = client.create_session().await.unwrap();
    client.put_offer(&token, "offer").await.unwrap();
    client.put_answer(&token, "answer").await.unwrap();

    let err = client.put_offer(&token, "offer2").await.unwrap_err();
    assert!(matches!(err, RendezvousError::Conflict));

    // The answer side stays writable for renegotiation.
    client.put_answer(&token, "answer2").await.unwrap();
    assert_eq!(
        client.get_answer(&token).await.unwrap().as_deref(),
        Some("answer2")
    );
}

#[tokio::test]
async fn failed_handshake_leaves_session_reconnectable() {
    let (base, _server) = start_server().await;
    let (_ep_a, ep_b) = loopback::pair();

    let (session_b, _events_b) = PeerSession::new(
        &base,
        PollConfig {
            interval: Duration::from_millis(10),
            timeout: Some(Duration::from_millis(80)),
        },
    );

    // Nobody ever posts an offer under this token.
    let client = RendezvousClient::new(&base);
    let token = client.create_session().await.unwrap();
    let err = session_b
        .connect_as_responder(&token, &ep_b)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Handshake(xdrop_peer::HandshakeError::Rendezvous(
            RendezvousError::Timeout
        ))
    ));
    assert_eq!(session_b.state(), SessionState::Failed);
    assert!(session_b.state().can_connect());
}
