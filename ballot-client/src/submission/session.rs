use anyhow::Context;
use slog::{info, Logger};
use std::sync::Arc;
use tokio::sync::OnceCell;

use ballot_common::logging::LoggerExtensions;
use ballot_common::StdResult;

use super::{SponsoredAccount, SponsoredAccountProvider};

/// Owner of the disposable sponsored account of a voting session.
///
/// The account is provisioned on first use and then reused for every submission of the
/// session: operations submitted by a replaced account could not be followed anymore.
pub struct SponsoredSession {
    provider: Arc<dyn SponsoredAccountProvider>,
    account: OnceCell<Arc<dyn SponsoredAccount>>,
    logger: Logger,
}

impl SponsoredSession {
    /// SponsoredSession factory
    pub fn new(provider: Arc<dyn SponsoredAccountProvider>, logger: Logger) -> Self {
        Self {
            provider,
            account: OnceCell::new(),
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Get the account of the session, provisioning it if needed.
    pub async fn account(&self) -> StdResult<Arc<dyn SponsoredAccount>> {
        let account = self
            .account
            .get_or_try_init(|| async {
                let account = self
                    .provider
                    .provision()
                    .await
                    .with_context(|| "Could not provision the sponsored account")?;
                info!(self.logger, "Sponsored account provisioned"; "smart_account" => %account.address());

                Ok::<_, anyhow::Error>(account)
            })
            .await?;

        Ok(account.clone())
    }

    /// Account of the session if it was already provisioned.
    pub fn current_account(&self) -> Option<Arc<dyn SponsoredAccount>> {
        self.account.get().cloned()
    }
}
