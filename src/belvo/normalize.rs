//! Account Normalizer
//!
//! Reshapes Belvo payloads into the uniform output schemas. Institutions do
//! not share a documented schema, so every lookup is permissive: fields may be
//! renamed, nested, numeric or textual, or absent. Absent means `null`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};

use crate::domain::transaction::TransactionAccount;
use crate::domain::{Institution, NormalizedAccount, TransactionDetail, TransactionSummary};

type JsonObject = Map<String, JsonValue>;

// =========================================================================
// Accounts
// =========================================================================

/// Normalize a list of raw accounts, skipping entries that are not objects.
///
/// `fallback_institution` is used when an account does not name its
/// institution (typically the institution the link was created for).
pub fn normalize_accounts(
    raw: &[JsonValue],
    fallback_institution: Option<&str>,
) -> Vec<NormalizedAccount> {
    raw.iter()
        .filter_map(|account| normalize_account(account, fallback_institution))
        .collect()
}

/// Normalize one raw account. Returns `None` if it is not a JSON object.
pub fn normalize_account(
    raw: &JsonValue,
    fallback_institution: Option<&str>,
) -> Option<NormalizedAccount> {
    let obj = raw.as_object()?;

    Some(NormalizedAccount {
        id: obj.get("id").and_then(scalar_string),
        institution: institution_name(obj).or_else(|| fallback_institution.map(str::to_string)),
        account_type: first_text(obj, &["type", "category", "account_type"]),
        balance: account_balance(obj),
        currency: account_currency(obj),
    })
}

/// Whether a raw account may be shown for `link_id`. Accounts that do not
/// report a link are kept; accounts reporting another link are not.
pub fn belongs_to_link(raw: &JsonValue, link_id: &str) -> bool {
    match raw.get("link").and_then(link_reference) {
        Some(link) => link == link_id,
        None => true,
    }
}

fn institution_name(obj: &JsonObject) -> Option<String> {
    let named = match obj.get("institution") {
        Some(JsonValue::Object(inst)) => first_text(inst, &["name", "display_name"]),
        Some(value) => scalar_string(value).filter(|s| !s.is_empty()),
        None => None,
    };
    named.or_else(|| first_text(obj, &["institution_name"]))
}

fn account_balance(obj: &JsonObject) -> Option<Decimal> {
    ["balance", "balances"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(balance_value))
}

/// A balance is either a bare amount or an object of named amounts
fn balance_value(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Object(balance) => ["current", "available"]
            .iter()
            .find_map(|key| balance.get(*key).and_then(decimal)),
        other => decimal(other),
    }
}

fn account_currency(obj: &JsonObject) -> Option<String> {
    first_text(obj, &["currency"])
        .or_else(|| {
            ["balance", "balances"].iter().find_map(|key| {
                obj.get(*key)
                    .and_then(JsonValue::as_object)
                    .and_then(|balance| first_text(balance, &["currency"]))
            })
        })
        .or_else(|| first_text(obj, &["currency_code"]))
}

// =========================================================================
// Institutions
// =========================================================================

/// Reshape one institution. Returns `None` if it is not a JSON object.
pub fn normalize_institution(raw: &JsonValue) -> Option<Institution> {
    let obj = raw.as_object()?;

    let country_codes = obj
        .get("country_codes")
        .and_then(JsonValue::as_array)
        .map(|codes| codes.iter().filter_map(scalar_string).collect())
        .unwrap_or_default();

    Some(Institution {
        id: obj.get("id").and_then(scalar_string),
        name: first_text(obj, &["name"]),
        display_name: first_text(obj, &["display_name"]),
        institution_type: first_text(obj, &["type"]),
        logo: first_text(obj, &["logo"]).unwrap_or_default(),
        icon_logo: first_text(obj, &["icon_logo"]).unwrap_or_default(),
        text_logo: first_text(obj, &["text_logo"]).unwrap_or_default(),
        country_codes,
        website: first_text(obj, &["website"]).unwrap_or_default(),
    })
}

// =========================================================================
// Transactions
// =========================================================================

/// Reshape one listed transaction. Returns `None` if it is not a JSON object.
pub fn normalize_transaction(raw: &JsonValue) -> Option<TransactionSummary> {
    let obj = raw.as_object()?;

    Some(TransactionSummary {
        id: obj.get("id").and_then(scalar_string),
        amount: obj.get("amount").and_then(decimal),
        transaction_type: first_text(obj, &["type"]),
        category: first_text(obj, &["category"]),
        description: first_text(obj, &["description"]),
        merchant: object_or_empty(obj, "merchant"),
        transacted_at: first_text(obj, &["transacted_at"]),
        status: first_text(obj, &["status"]),
    })
}

/// Reshape a full transaction, including its account. Returns `None` if it
/// is not a JSON object.
pub fn normalize_transaction_detail(raw: &JsonValue) -> Option<TransactionDetail> {
    let obj = raw.as_object()?;

    let account = obj
        .get("account")
        .and_then(JsonValue::as_object)
        .map(|acc| TransactionAccount {
            id: acc.get("id").and_then(scalar_string),
            link: acc.get("link").and_then(link_reference),
            institution: acc.get("institution").cloned().unwrap_or(JsonValue::Null),
            name: first_text(acc, &["name"]),
            category: first_text(acc, &["category"]),
            balance: acc.get("balance").cloned().unwrap_or(JsonValue::Null),
            currency: first_text(acc, &["currency"]),
        });

    Some(TransactionDetail {
        id: obj.get("id").and_then(scalar_string),
        internal_identification: first_text(obj, &["internal_identification"]),
        account,
        amount: obj.get("amount").and_then(decimal),
        local_currency_amount: obj.get("local_currency_amount").and_then(decimal),
        currency: first_text(obj, &["currency"]),
        description: first_text(obj, &["description"]),
        category: first_text(obj, &["category"]),
        subcategory: first_text(obj, &["subcategory"]),
        transaction_type: first_text(obj, &["type"]),
        status: first_text(obj, &["status"]),
        merchant: object_or_empty(obj, "merchant"),
        credit_card_data: object_or_empty(obj, "credit_card_data"),
        transacted_at: first_text(obj, &["transacted_at"]),
        created_at: first_text(obj, &["created_at"]),
        value_date: first_text(obj, &["value_date"]),
        payment_type: first_text(obj, &["payment_type"]),
        operation_type: first_text(obj, &["operation_type"]),
        operation_type_additional_info: first_text(obj, &["operation_type_additional_info"]),
        counterparty: object_or_empty(obj, "counterparty"),
        loan_data: object_or_empty(obj, "loan_data"),
    })
}

/// A link may be reported as its id or as an embedded link object
fn link_reference(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(link) => link.get("id").and_then(scalar_string),
        other => scalar_string(other),
    }
}

// =========================================================================
// Field helpers
// =========================================================================

/// First key holding a non-empty scalar, as text
fn first_text(obj: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
    })
}

/// Strings as-is, numbers and booleans rendered; everything else is absent
fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings as decimals
fn decimal(value: &JsonValue) -> Option<Decimal> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Nested object, or `{}` when absent or null
fn object_or_empty(obj: &JsonObject, key: &str) -> JsonValue {
    match obj.get(key) {
        Some(JsonValue::Null) | None => JsonValue::Object(Map::new()),
        Some(value) => value.clone(),
    }
}
