//! Session helpers pointing the client at a mock API

use helios_client::{Config, Resource, ResourceKind, RetryConfig, Session};
use wiremock::MockServer;

/// Configuration for a mock server: retries off, defaults otherwise
pub fn mock_config(server: &MockServer) -> Config {
    Config {
        api_url: server.uri(),
        retry: RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        },
        ..Config::default()
    }
}

/// Session against `server` with an opaque API key header
pub fn mock_session(server: &MockServer) -> Session {
    Session::new(
        mock_config(server),
        Some(helios_client::AuthHeader::new("X-Api-Key", "test-key")),
    )
    .expect("mock session")
}

/// Resource of `kind` against `server`
pub fn mock_resource(server: &MockServer, kind: ResourceKind) -> Resource {
    Resource::new(&mock_session(server), kind).expect("mock resource")
}
