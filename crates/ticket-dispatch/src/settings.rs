//! Deployment-wide dispatch settings

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ticket_access::DenialLinks;

/// Settings shared by every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Drop invocations from guilds without premium
    pub premium_only: bool,
    /// Running as a whitelabel bot
    pub whitelabel: bool,
    /// Premium and vote links for denials
    pub links: DenialLinks,
    /// Support server invite shown with error replies
    pub support_server_invite: String,
    /// Documentation root
    pub docs_url: String,
    /// Dashboard root
    pub dashboard_url: String,
    /// Bound on the staff lookup made while building error replies
    pub error_lookup_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            premium_only: false,
            whitelabel: false,
            links: DenialLinks::default(),
            support_server_invite: "https://discord.gg/ticketsbot".to_owned(),
            docs_url: "https://docs.ticketsbot.cloud".to_owned(),
            dashboard_url: "https://dashboard.ticketsbot.cloud".to_owned(),
            error_lookup_timeout: Duration::from_secs(3),
        }
    }
}

impl DispatchSettings {
    /// Builder: whitelabel deployment
    #[must_use]
    pub fn with_whitelabel(mut self, whitelabel: bool) -> Self {
        self.whitelabel = whitelabel;
        self
    }

    /// Builder: premium-only deployment
    #[must_use]
    pub fn with_premium_only(mut self, premium_only: bool) -> Self {
        self.premium_only = premium_only;
        self
    }
}
