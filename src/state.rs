//! Shared application state
//!
//! Everything a request handler needs, cheap to clone per request.

use std::sync::Arc;

use crate::auth::JwtService;
use crate::belvo::{BelvoClient, SandboxCredential, SANDBOX_CREDENTIALS};
use crate::store::{LinkRegistry, ResetCodeStore, TokenBlacklist, UserRepository};

/// Handler state: repositories, token service and the Belvo client
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub links: Arc<dyn LinkRegistry>,
    pub revoked_tokens: Arc<dyn TokenBlacklist>,
    pub reset_codes: Arc<dyn ResetCodeStore>,
    pub jwt: Arc<JwtService>,
    pub belvo: Arc<BelvoClient>,
    /// Institutions `create_test_links` connects to
    pub sandbox: &'static [SandboxCredential],
    /// Return issued reset codes in the response body. There is no mail
    /// transport, so this is how codes reach the user outside production.
    pub expose_reset_codes: bool,
}

impl AppState {
    /// Build state over a store that implements every repository
    pub fn new<S>(store: S, jwt: JwtService, belvo: BelvoClient) -> Self
    where
        S: UserRepository + LinkRegistry + TokenBlacklist + ResetCodeStore + 'static,
    {
        let store = Arc::new(store);
        let users: Arc<dyn UserRepository> = store.clone();
        let links: Arc<dyn LinkRegistry> = store.clone();
        let revoked_tokens: Arc<dyn TokenBlacklist> = store.clone();
        let reset_codes: Arc<dyn ResetCodeStore> = store;

        Self {
            users,
            links,
            revoked_tokens,
            reset_codes,
            jwt: Arc::new(jwt),
            belvo: Arc::new(belvo),
            sandbox: SANDBOX_CREDENTIALS,
            expose_reset_codes: false,
        }
    }

    /// Override the sandbox institutions used for test links
    pub fn with_sandbox(mut self, sandbox: &'static [SandboxCredential]) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_exposed_reset_codes(mut self, expose: bool) -> Self {
        self.expose_reset_codes = expose;
        self
    }
}
