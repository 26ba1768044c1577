//! Account service for the Instagram credential lifecycle
//!
//! Covers the full life of a connected account: building the authorization
//! URL, turning an OAuth callback code into a stored long-lived token,
//! keeping that token fresh, and listing/deactivating accounts.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::db::Database;
use crate::error::{ConfigError, GramcastError, Result};
use crate::instagram::InstagramApi;
use crate::types::Account;

/// Refresh a token once it has less than this long left to live
const REFRESH_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Scopes requested when sending a user through the consent flow
const OAUTH_SCOPES: &str = "instagram_business_basic,instagram_business_content_publish";

/// Account service
///
/// Owns every mutation of account rows. Publishing flows only read accounts,
/// with one exception: the pre-publish refresh, which goes through
/// [`refresh_if_needed`](Self::refresh_if_needed) here.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<Database>,
    config: Arc<Config>,
    api: Arc<dyn InstagramApi>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, config: Arc<Config>, api: Arc<dyn InstagramApi>) -> Self {
        Self { db, config, api }
    }

    /// URL to send a user to for granting access
    ///
    /// Pure construction from configuration; no remote call is made.
    pub fn authorization_url(&self) -> Result<String> {
        let base = format!(
            "{}/oauth/authorize",
            self.config.instagram.auth_base_url.trim_end_matches('/')
        );
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.config.instagram.app_id.as_str()),
                ("redirect_uri", self.config.instagram.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPES),
            ],
        )
        .map_err(|e| {
            GramcastError::Config(ConfigError::MissingField(format!(
                "instagram.auth_base_url is not a valid URL: {}",
                e
            )))
        })?;
        Ok(url.into())
    }

    /// Complete an OAuth callback: exchange the code, upgrade the token,
    /// fetch the profile, and upsert the account
    ///
    /// Accounts are keyed by the Instagram user id, so reconnecting the same
    /// user updates the existing row (and reactivates it if it was
    /// deactivated) rather than creating a duplicate. This is the only path
    /// that creates account rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty code and `ApiError` when any of
    /// the three remote steps fails; nothing is persisted in either case.
    pub async fn connect(&self, code: &str) -> Result<Account> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GramcastError::InvalidInput(
                "authorization code must not be empty".to_string(),
            ));
        }

        let exchange = self.api.exchange_code(code).await?;
        debug!(user_id = exchange.user_id, "Authorization code accepted");

        let token = self.api.exchange_long_lived(&exchange.access_token).await?;
        let expires_at = chrono::Utc::now().timestamp() + token.expires_in;

        let profile = self.api.fetch_profile(&token.access_token).await?;

        let account = match self
            .db
            .get_account_by_instagram_user_id(&profile.id)
            .await?
        {
            Some(mut existing) => {
                existing.username = profile.username;
                existing.display_name = profile.name;
                existing.profile_picture_url = profile.profile_picture_url;
                existing.access_token = token.access_token;
                existing.token_expires_at = expires_at;
                existing.is_active = true;
                existing.updated_at = chrono::Utc::now().timestamp();
                self.db.update_account(&existing).await?;
                info!(
                    "Reconnected account {} (@{})",
                    existing.id, existing.username
                );
                existing
            }
            None => {
                let mut account = Account::new(
                    profile.id,
                    profile.username,
                    token.access_token,
                    expires_at,
                );
                account.display_name = profile.name;
                account.profile_picture_url = profile.profile_picture_url;
                self.db.create_account(&account).await?;
                info!("Connected account {} (@{})", account.id, account.username);
                account
            }
        };

        Ok(account)
    }

    /// Refresh the account's token when it is close to expiry
    ///
    /// Returns the account unchanged when more than the refresh window
    /// remains. Otherwise calls the refresh endpoint with the current token,
    /// persists the replacement, and returns the updated account. Must run
    /// before any publishing use of the token; a token that expires
    /// mid-pipeline cannot be recovered.
    pub async fn refresh_if_needed(&self, account: &Account) -> Result<Account> {
        if !account.token_expires_within(REFRESH_WINDOW_SECS) {
            return Ok(account.clone());
        }

        info!(
            "Token for account {} expires soon, refreshing",
            account.id
        );
        let refreshed = self.api.refresh_token(&account.access_token).await?;

        let mut updated = account.clone();
        updated.access_token = refreshed.access_token;
        updated.token_expires_at = chrono::Utc::now().timestamp() + refreshed.expires_in;
        updated.updated_at = chrono::Utc::now().timestamp();
        self.db.update_account(&updated).await?;

        Ok(updated)
    }

    /// Look up an account that is still active
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown or the account has been
    /// deactivated.
    pub async fn get_active(&self, account_id: &str) -> Result<Account> {
        self.db
            .get_active_account(account_id)
            .await?
            .ok_or_else(|| {
                GramcastError::NotFound(format!("No active account with id {}", account_id))
            })
    }

    /// All active accounts, newest first
    pub async fn list_active(&self) -> Result<Vec<Account>> {
        self.db.list_active_accounts().await
    }

    /// Soft-deactivate an account
    ///
    /// The row is kept (posts keep referencing it) but the account no longer
    /// resolves for publishing or listing. Reconnecting the same Instagram
    /// user reactivates it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the account is missing or already inactive.
    pub async fn deactivate(&self, account_id: &str) -> Result<()> {
        let deactivated = self.db.deactivate_account(account_id).await?;
        if !deactivated {
            return Err(GramcastError::NotFound(format!(
                "No active account with id {}",
                account_id
            )));
        }
        info!("Deactivated account {}", account_id);
        Ok(())
    }
}
