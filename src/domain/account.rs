//! Normalized account and institution shapes
//!
//! Uniform output schemas produced from heterogeneous Belvo payloads.

use rust_decimal::Decimal;
use serde::Serialize;

/// One bank account, reshaped to the same schema for every institution.
///
/// Every field is optional: institutions omit or rename fields freely, and a
/// missing value is reported as `null` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedAccount {
    pub id: Option<String>,
    pub institution: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

/// Institution available for linking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Institution {
    pub id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub institution_type: Option<String>,
    pub logo: String,
    pub icon_logo: String,
    pub text_logo: String,
    pub country_codes: Vec<String>,
    pub website: String,
}
