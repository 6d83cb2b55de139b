//! Aggregation Handler
//!
//! Belvo-backed operations for an authenticated user: sandbox link creation,
//! normalized accounts, institutions and transactions. Every operation is
//! scoped to the links recorded for the user.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::belvo::client::{results, TransactionQuery};
use crate::belvo::normalize::{
    belongs_to_link, normalize_accounts, normalize_institution, normalize_transaction,
    normalize_transaction_detail,
};
use crate::belvo::{BelvoClient, BelvoError, SandboxCredential};
use crate::domain::{
    DomainError, Institution, Link, NormalizedAccount, OperationContext, TransactionDetail,
    TransactionKpi, TransactionSummary,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::LinkRegistry;

use super::{CreateTestLinksResult, CreatedLink, TransactionsCommand, TransactionsReport};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Handler for every `/api/belvo/*` operation
pub struct AggregationHandler {
    links: Arc<dyn LinkRegistry>,
    belvo: Arc<BelvoClient>,
    sandbox: &'static [SandboxCredential],
}

impl AggregationHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            links: state.links.clone(),
            belvo: state.belvo.clone(),
            sandbox: state.sandbox,
        }
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Create a link per sandbox institution, register its accounts, and
    /// record it for the user.
    ///
    /// A failing institution is skipped. Fails only if none succeeded.
    pub async fn create_test_links(
        &self,
        user_id: Uuid,
        context: &OperationContext,
    ) -> Result<CreateTestLinksResult, AppError> {
        let mut created = Vec::with_capacity(self.sandbox.len());
        let mut last_error = None;

        for credential in self.sandbox {
            match self.connect(credential).await {
                Ok((id, status, accounts_registered)) => {
                    self.links
                        .record(Link::new(id.clone(), user_id, credential.institution))
                        .await?;

                    tracing::info!(
                        user_id = %user_id,
                        link_id = %id,
                        institution = credential.institution,
                        accounts_registered,
                        correlation_id = ?context.correlation_id,
                        "Test link created"
                    );

                    created.push(CreatedLink {
                        id,
                        institution: credential.institution.to_string(),
                        status,
                        accounts_registered,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        institution = credential.institution,
                        error = %e,
                        correlation_id = ?context.correlation_id,
                        "Skipping sandbox institution"
                    );
                    last_error = Some(e);
                }
            }
        }

        if created.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }

        Ok(CreateTestLinksResult {
            message: format!("Created and registered {} links", created.len()),
            links: created,
        })
    }

    /// Create one link and register its accounts. Returns the link id, its
    /// status, and how many accounts Belvo reported.
    async fn connect(
        &self,
        credential: &SandboxCredential,
    ) -> Result<(String, Option<String>, usize), BelvoError> {
        let link = self
            .belvo
            .create_link(
                credential.institution,
                credential.username,
                credential.password,
            )
            .await?;

        let id = link
            .get("id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| BelvoError::UnexpectedResponse("link without an id".to_string()))?
            .to_string();

        let status = link
            .get("status")
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        let accounts = self.belvo.register_accounts(&id).await?;
        Ok((id, status, results(accounts).len()))
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Normalized accounts across every link of the user
    pub async fn all_accounts(&self, user_id: Uuid) -> Result<Vec<NormalizedAccount>, AppError> {
        let links = self.links.links_for_user(user_id).await?;

        let mut accounts = Vec::new();
        for link in &links {
            accounts.extend(self.accounts_of(link).await?);
        }

        tracing::debug!(
            user_id = %user_id,
            links = links.len(),
            accounts = accounts.len(),
            "Aggregated accounts"
        );

        Ok(accounts)
    }

    /// Normalized accounts of one link. A link the user does not own yields
    /// no accounts.
    pub async fn accounts_for_link(
        &self,
        user_id: Uuid,
        link_id: &str,
    ) -> Result<Vec<NormalizedAccount>, AppError> {
        let link_id = link_id.trim();
        if link_id.is_empty() {
            return Err(DomainError::MissingParameter("link_id").into());
        }

        match self.links.find_for_user(user_id, link_id).await? {
            Some(link) => self.accounts_of(&link).await,
            None => Ok(Vec::new()),
        }
    }

    async fn accounts_of(&self, link: &Link) -> Result<Vec<NormalizedAccount>, AppError> {
        let raw: Vec<JsonValue> = results(self.belvo.list_accounts(Some(&link.id)).await?)
            .into_iter()
            .filter(|account| belongs_to_link(account, &link.id))
            .collect();

        Ok(normalize_accounts(&raw, Some(&link.institution)))
    }

    // =========================================================================
    // Institutions
    // =========================================================================

    pub async fn institutions(&self) -> Result<Vec<Institution>, AppError> {
        let raw = results(self.belvo.list_institutions().await?);
        Ok(raw.iter().filter_map(normalize_institution).collect())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Transactions of one account of an owned link, with income/expense KPI
    pub async fn transactions(
        &self,
        user_id: Uuid,
        command: TransactionsCommand,
    ) -> Result<TransactionsReport, AppError> {
        let link_id = required(command.link_id, "link_id")?;
        let account_id = required(command.account_id, "account_id")?;
        let date_from = parse_date(required(command.date_from, "date_from")?, "date_from")?;
        let date_to = parse_date(required(command.date_to, "date_to")?, "date_to")?;

        if date_from > date_to {
            return Err(AppError::Validation(
                "date_from must not be after date_to".to_string(),
            ));
        }

        if self.links.find_for_user(user_id, &link_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Link {} not found", link_id)));
        }

        let query = TransactionQuery {
            link: link_id,
            account: account_id,
            date_from: date_from.format(DATE_FORMAT).to_string(),
            date_to: date_to.format(DATE_FORMAT).to_string(),
        };

        let transactions: Vec<TransactionSummary> =
            results(self.belvo.list_transactions(&query).await?)
                .iter()
                .filter_map(normalize_transaction)
                .collect();

        let kpi = TransactionKpi::from_transactions(&transactions)
            .ok_or_else(|| AppError::Upstream("transaction amounts overflow".to_string()))?;

        Ok(TransactionsReport { kpi, transactions })
    }

    /// One transaction in detail, only if it belongs to one of the user's links
    pub async fn transaction_details(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Result<TransactionDetail, AppError> {
        let not_found = || AppError::NotFound(format!("Transaction {} not found", transaction_id));

        let raw = match self.belvo.get_transaction(transaction_id).await {
            Ok(raw) => raw,
            Err(BelvoError::InvalidUrl(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let detail = normalize_transaction_detail(&raw).ok_or_else(|| {
            AppError::Upstream("transaction payload is not an object".to_string())
        })?;

        let owned = match detail.link_id() {
            Some(link_id) => self.links.find_for_user(user_id, link_id).await?.is_some(),
            None => false,
        };
        if !owned {
            return Err(not_found());
        }

        Ok(detail)
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, DomainError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DomainError::MissingParameter(name))
}

fn parse_date(value: String, name: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("{} must be a date in YYYY-MM-DD format", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::test_state;

    #[test]
    fn test_required_parameter() {
        assert_eq!(required(Some(" x ".into()), "link_id").unwrap(), "x");
        assert!(matches!(
            required(Some("  ".into()), "link_id"),
            Err(DomainError::MissingParameter("link_id"))
        ));
        assert!(required(None, "account_id").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29".into(), "date_from").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29".into(), "date_from").is_err());
        assert!(parse_date("29/02/2024".into(), "date_from").is_err());
    }

    #[tokio::test]
    async fn test_all_accounts_without_links_is_empty() {
        let state = test_state();
        let accounts = AggregationHandler::new(&state)
            .all_accounts(Uuid::new_v4())
            .await
            .unwrap();
        assert!(accounts.is_empty());
    }

    #[tokio::test]
    async fn test_no_sandbox_institutions_creates_nothing() {
        let state = test_state().with_sandbox(&[]);
        let result = AggregationHandler::new(&state)
            .create_test_links(Uuid::new_v4(), &OperationContext::new())
            .await
            .unwrap();
        assert!(result.links.is_empty());
        assert_eq!(result.message, "Created and registered 0 links");
    }

    #[tokio::test]
    async fn test_unknown_link_has_no_accounts() {
        let state = test_state();
        let accounts = AggregationHandler::new(&state)
            .accounts_for_link(Uuid::new_v4(), "not-mine")
            .await
            .unwrap();
        assert!(accounts.is_empty());
    }

    #[tokio::test]
    async fn test_accounts_require_link_id() {
        let state = test_state();
        let err = AggregationHandler::new(&state)
            .accounts_for_link(Uuid::new_v4(), " ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_transactions_missing_parameter() {
        let state = test_state();
        let err = AggregationHandler::new(&state)
            .transactions(
                Uuid::new_v4(),
                TransactionsCommand {
                    link_id: Some("l".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("account_id")));
    }

    #[tokio::test]
    async fn test_transactions_reversed_range() {
        let state = test_state();
        let err = AggregationHandler::new(&state)
            .transactions(
                Uuid::new_v4(),
                TransactionsCommand {
                    link_id: Some("l".into()),
                    account_id: Some("a".into()),
                    date_from: Some("2024-03-01".into()),
                    date_to: Some("2024-02-01".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_transactions_unowned_link_not_found() {
        let state = test_state();
        let err = AggregationHandler::new(&state)
            .transactions(
                Uuid::new_v4(),
                TransactionsCommand {
                    link_id: Some("l".into()),
                    account_id: Some("a".into()),
                    date_from: Some("2024-01-01".into()),
                    date_to: Some("2024-02-01".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unsafe_transaction_id_not_found() {
        let state = test_state();
        let err = AggregationHandler::new(&state)
            .transaction_details(Uuid::new_v4(), "../links")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
