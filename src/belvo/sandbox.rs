//! Belvo sandbox credentials
//!
//! Fixed institution logins that the Belvo sandbox accepts; used to create
//! test links without real bank credentials.

/// One sandbox institution login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxCredential {
    pub institution: &'static str,
    pub username: &'static str,
    pub password: &'static str,
}

/// Institutions a test link is created for, in order
pub const SANDBOX_CREDENTIALS: &[SandboxCredential] = &[
    SandboxCredential {
        institution: "erebor_mx_retail",
        username: "bnk100",
        password: "full",
    },
    SandboxCredential {
        institution: "gotham_mx_business",
        username: "bnk100",
        password: "full",
    },
];
