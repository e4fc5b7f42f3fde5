//! REST session layer end-to-end: register, send, peers, messages,
//! disconnect, and the store-and-forward catch-up path. Drives a real
//! in-process server with `reqwest` against a `127.0.0.1:0` listener.

use relay::{config::RelayConfig, identity::generate_keypair, rest_router, state::AppState};
use relay_protocol::{
    RestMessagesResponse, RestPeersResponse, RestRegisterRequest, RestRegisterResponse,
    RestSendRequest, RestSendResponse,
};

async fn spawn_rest_server(config: RelayConfig) -> (String, AppState) {
    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    let router = rest_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (format!("http://{addr}"), state)
}

async fn register(
    client: &reqwest::Client,
    base: &str,
    public_key: &str,
    private_key: &str,
    name: Option<&str>,
) -> RestRegisterResponse {
    client
        .post(format!("{base}/v1/register"))
        .json(&RestRegisterRequest {
            public_key: public_key.to_owned(),
            private_key: private_key.to_owned(),
            name: name.map(str::to_owned),
            metadata: None,
        })
        .send()
        .await
        .expect("register request")
        .json()
        .await
        .expect("register response body")
}

/// Registering over REST, send a message, and read it back via the REST
/// peer/message endpoints.
#[tokio::test]
async fn register_send_and_poll_round_trip() {
    let (base, _state) = spawn_rest_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();

    let (pk_a, sk_a) = generate_keypair();
    let (pk_b, sk_b) = generate_keypair();

    let reg_a = register(&client, &base, &pk_a, &sk_a, Some("A")).await;
    assert!(reg_a.peers.unwrap().is_empty());
    let reg_b = register(&client, &base, &pk_b, &sk_b, Some("B")).await;
    let peers_seen_by_b = reg_b.peers.unwrap();
    assert_eq!(peers_seen_by_b.len(), 1);
    assert_eq!(peers_seen_by_b[0].public_key, pk_a);

    let send_response: RestSendResponse = client
        .post(format!("{base}/v1/send"))
        .bearer_auth(&reg_a.token)
        .json(&RestSendRequest {
            to: pk_b.clone(),
            envelope_type: "publish".to_owned(),
            payload: serde_json::json!({"text": "hello from a"}),
            in_reply_to: None,
        })
        .send()
        .await
        .expect("send request")
        .json()
        .await
        .expect("send response body");
    assert!(send_response.ok);

    let messages: RestMessagesResponse = client
        .get(format!("{base}/v1/messages"))
        .bearer_auth(&reg_b.token)
        .send()
        .await
        .expect("messages request")
        .json()
        .await
        .expect("messages response body");
    assert_eq!(messages.messages.len(), 1);
    assert_eq!(messages.messages[0].id, send_response.message_id);

    // A second poll finds the queue already drained.
    let messages_again: RestMessagesResponse = client
        .get(format!("{base}/v1/messages"))
        .bearer_auth(&reg_b.token)
        .send()
        .await
        .expect("messages request")
        .json()
        .await
        .expect("messages response body");
    assert!(messages_again.messages.is_empty());
}

/// A request with a missing/unknown bearer token is rejected uniformly as
/// `unauthorized`.
#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let (base, _state) = spawn_rest_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/v1/peers"))
        .send()
        .await
        .expect("peers request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{base}/v1/peers"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .expect("peers request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

/// Mismatched key pairs are rejected at registration with `bad_request`.
#[tokio::test]
async fn register_rejects_mismatched_key_pair() {
    let (base, _state) = spawn_rest_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();
    let (pk_a, _sk_a) = generate_keypair();
    let (_pk_b, sk_b) = generate_keypair();

    let response = client
        .post(format!("{base}/v1/register"))
        .json(&RestRegisterRequest {
            public_key: pk_a,
            private_key: sk_b,
            name: None,
            metadata: None,
        })
        .send()
        .await
        .expect("register request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

/// Disconnecting revokes the token: a subsequent authenticated request
/// fails, and the registry no longer lists the peer.
#[tokio::test]
async fn disconnect_revokes_token_and_drops_from_peer_list() {
    let (base, _state) = spawn_rest_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();

    let (pk_a, sk_a) = generate_keypair();
    let (pk_b, sk_b) = generate_keypair();
    let reg_a = register(&client, &base, &pk_a, &sk_a, None).await;
    let reg_b = register(&client, &base, &pk_b, &sk_b, None).await;

    let response = client
        .delete(format!("{base}/v1/disconnect"))
        .bearer_auth(&reg_a.token)
        .send()
        .await
        .expect("disconnect request");
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{base}/v1/peers"))
        .bearer_auth(&reg_a.token)
        .send()
        .await
        .expect("peers request after disconnect");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let peers: RestPeersResponse = client
        .get(format!("{base}/v1/peers"))
        .bearer_auth(&reg_b.token)
        .send()
        .await
        .expect("peers request")
        .json()
        .await
        .expect("peers response body");
    assert!(peers.peers.is_empty());
}

/// Messages addressed to a configured stored-for peer that is
/// currently offline are buffered and handed over as soon as that peer
/// registers over REST.
#[tokio::test]
async fn stored_for_peer_catches_up_on_rest_registration() {
    let (pk_stored, sk_stored) = generate_keypair();
    let mut config = RelayConfig::default();
    config.stored_for = vec![pk_stored.clone()];
    let (base, _state) = spawn_rest_server(config).await;
    let client = reqwest::Client::new();

    let (pk_sender, sk_sender) = generate_keypair();
    let reg_sender = register(&client, &base, &pk_sender, &sk_sender, None).await;

    // pk_stored appears in the peer list even though it has never connected.
    assert_eq!(reg_sender.peers.as_ref().unwrap().len(), 1);
    assert_eq!(reg_sender.peers.unwrap()[0].public_key, pk_stored);

    let send_response: RestSendResponse = client
        .post(format!("{base}/v1/send"))
        .bearer_auth(&reg_sender.token)
        .json(&RestSendRequest {
            to: pk_stored.clone(),
            envelope_type: "publish".to_owned(),
            payload: serde_json::json!({"text": "while you were out"}),
            in_reply_to: None,
        })
        .send()
        .await
        .expect("send request")
        .json()
        .await
        .expect("send response body");
    assert!(send_response.ok, "sending to an offline stored-for peer must succeed");

    let reg_stored = register(&client, &base, &pk_stored, &sk_stored, None).await;
    let messages: RestMessagesResponse = client
        .get(format!("{base}/v1/messages"))
        .bearer_auth(&reg_stored.token)
        .send()
        .await
        .expect("messages request")
        .json()
        .await
        .expect("messages response body");
    assert_eq!(messages.messages.len(), 1);
    assert_eq!(messages.messages[0].id, send_response.message_id);
}
