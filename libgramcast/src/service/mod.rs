//! Service layer for Gramcast
//!
//! This module provides a clean, testable API for business logic that can
//! be consumed by multiple interfaces (CLI, HTTP, GUI) without code
//! duplication.
//!
//! # Architecture
//!
//! The service layer follows a facade pattern with `GramcastService` as the
//! main entry point, coordinating two specialized sub-services:
//!
//! - `AccountService`: OAuth connect flow and token lifecycle
//! - `PublishingService`: the container publish pipeline and post history
//!
//! # Example
//!
//! ```no_run
//! use libgramcast::service::GramcastService;
//! use libgramcast::service::publishing::PostRequest;
//!
//! # async fn example() -> libgramcast::Result<()> {
//! let service = GramcastService::new().await?;
//!
//! let request = PostRequest {
//!     account_id: "b51a8c2e-...".to_string(),
//!     media_url: "https://cdn.example.com/sunset.jpg".to_string(),
//!     caption: Some("Golden hour".to_string()),
//!     media_kind: None,
//! };
//!
//! let post = service.publishing().create_post(request).await?;
//! println!("Published as {:?}", post.instagram_media_id);
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod publishing;

// Re-export commonly used types
pub use publishing::PostRequest;

use std::sync::Arc;

use self::accounts::AccountService;
use self::publishing::PublishingService;
use crate::instagram::graph::GraphClient;
use crate::instagram::InstagramApi;
use crate::{Config, Database, Result};

/// Main service facade that coordinates the sub-services
///
/// `GramcastService` provides a single entry point for all service
/// operations, managing shared resources (Database, Config) and wiring the
/// Instagram client into both sub-services.
pub struct GramcastService {
    db: Arc<Database>,
    accounts: AccountService,
    publishing: PublishingService,
}

impl GramcastService {
    /// Create a new service with default configuration
    ///
    /// This loads configuration from the default location, initializes the
    /// database, and builds the real Graph API client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration cannot be loaded
    /// - Database cannot be initialized
    /// - Database migrations fail
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the database
    /// cannot be initialized.
    pub async fn from_config(config: Config) -> Result<Self> {
        let api: Arc<dyn InstagramApi> = Arc::new(GraphClient::new(&config.instagram)?);
        Self::with_api(config, api).await
    }

    /// Create a service with a caller-supplied Instagram client
    ///
    /// Used by tests to substitute the mock client, and available to
    /// embedders that need a customized one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized or its
    /// migrations fail.
    pub async fn with_api(config: Config, api: Arc<dyn InstagramApi>) -> Result<Self> {
        let db = Arc::new(Database::new(&config.database.path).await?);
        let config = Arc::new(config);

        let accounts = AccountService::new(Arc::clone(&db), Arc::clone(&config), Arc::clone(&api));
        let publishing = PublishingService::new(
            Arc::clone(&db),
            Arc::clone(&config),
            Arc::clone(&api),
            accounts.clone(),
        );

        Ok(Self {
            db,
            accounts,
            publishing,
        })
    }

    /// Access the database directly
    ///
    /// Provides direct access for read paths that bypass the services,
    /// such as ad-hoc history queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Access the account service
    ///
    /// The account service handles the OAuth connect flow, token refresh,
    /// and account listing/deactivation.
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Access the publishing service
    ///
    /// The publishing service runs the container pipeline and serves post
    /// lookups.
    pub fn publishing(&self) -> &PublishingService {
        &self.publishing
    }
}
