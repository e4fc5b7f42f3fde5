// relay-test-support: a mock WS client for integration-testing the relay's
// WS session endpoint.
//
// The relay has no outbound WS client of its own to test against a mock
// server -- it only ever accepts connections -- so only a client half is
// needed here.

pub mod mock_ws_client;

pub use mock_ws_client::{Inbound, MockWsClient};
