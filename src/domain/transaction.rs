//! Transaction shapes and the balance KPI

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Direction marker Belvo uses for money coming in
pub const INFLOW: &str = "INFLOW";
/// Direction marker Belvo uses for money going out
pub const OUTFLOW: &str = "OUTFLOW";

/// Transaction as listed under an account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub id: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub merchant: JsonValue,
    pub transacted_at: Option<String>,
    pub status: Option<String>,
}

/// Income/expense totals over a set of transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransactionKpi {
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
}

impl TransactionKpi {
    /// Sum `INFLOW` amounts as income and `OUTFLOW` amounts as expenses.
    ///
    /// Transactions without an amount or with any other type are ignored.
    /// Returns `None` when the totals overflow `Decimal`.
    pub fn from_transactions(transactions: &[TransactionSummary]) -> Option<Self> {
        let mut kpi = Self::default();

        for tx in transactions {
            let Some(amount) = tx.amount else { continue };
            match tx.transaction_type.as_deref() {
                Some(INFLOW) => kpi.income = kpi.income.checked_add(amount)?,
                Some(OUTFLOW) => kpi.expenses = kpi.expenses.checked_add(amount)?,
                _ => {}
            }
        }

        kpi.balance = kpi.income.checked_sub(kpi.expenses)?;
        Some(kpi)
    }
}

/// Account embedded in a transaction detail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAccount {
    pub id: Option<String>,
    pub link: Option<String>,
    pub institution: JsonValue,
    pub name: Option<String>,
    pub category: Option<String>,
    pub balance: JsonValue,
    pub currency: Option<String>,
}

/// Full view of a single transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetail {
    pub id: Option<String>,
    pub internal_identification: Option<String>,
    pub account: Option<TransactionAccount>,
    pub amount: Option<Decimal>,
    pub local_currency_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub merchant: JsonValue,
    pub credit_card_data: JsonValue,
    pub transacted_at: Option<String>,
    pub created_at: Option<String>,
    pub value_date: Option<String>,
    pub payment_type: Option<String>,
    pub operation_type: Option<String>,
    pub operation_type_additional_info: Option<String>,
    pub counterparty: JsonValue,
    pub loan_data: JsonValue,
}

impl TransactionDetail {
    /// Link id of the account this transaction belongs to, if reported
    pub fn link_id(&self) -> Option<&str> {
        self.account.as_ref().and_then(|a| a.link.as_deref())
    }
}
