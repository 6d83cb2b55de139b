//! Shared fixtures for handler tests
//!
//! Handlers run over the in-memory store. The Belvo client points at a
//! closed local port, so only paths that never reach upstream are covered
//! here; the HTTP-level tests in `tests/` run against a fake Belvo server.

use std::time::Duration;

use crate::auth::JwtService;
use crate::belvo::BelvoClient;
use crate::config::{BelvoConfig, BelvoCredentials, JwtConfig};
use crate::state::AppState;
use crate::store::MemoryStore;

pub(crate) fn test_state() -> AppState {
    let jwt = JwtService::new(&JwtConfig {
        secret: "handler-test-secret".to_string(),
        access_ttl: Duration::from_secs(300),
        refresh_ttl: Duration::from_secs(3600),
    });
    let belvo = BelvoClient::new(&BelvoConfig {
        api_url: "http://127.0.0.1:9/api/".to_string(),
        credentials: BelvoCredentials::new("id", "pw"),
        timeout: Duration::from_secs(1),
    })
    .unwrap();

    AppState::new(MemoryStore::new(), jwt, belvo)
}

mod commands {
    use crate::handlers::{LogoutCommand, RegisterUserCommand, TransactionsCommand};
    use uuid::Uuid;

    #[test]
    fn test_register_command_with_names() {
        let cmd = RegisterUserCommand::new("a@b.com".to_string(), "p".to_string());
        assert!(cmd.first_name.is_none());

        let cmd = cmd.with_names("Ana".to_string(), "Lopez".to_string());
        assert_eq!(cmd.first_name.as_deref(), Some("Ana"));
        assert_eq!(cmd.last_name.as_deref(), Some("Lopez"));
    }

    #[test]
    fn test_logout_command() {
        let user_id = Uuid::new_v4();
        let cmd = LogoutCommand::new("token".to_string(), user_id);
        assert_eq!(cmd.refresh_token, "token");
        assert_eq!(cmd.requested_by, user_id);
    }

    #[test]
    fn test_transactions_command_from_query() {
        let cmd: TransactionsCommand = serde_json::from_value(serde_json::json!({
            "link_id": "l1",
            "date_from": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(cmd.link_id.as_deref(), Some("l1"));
        assert!(cmd.account_id.is_none());
    }
}
