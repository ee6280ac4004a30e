//! Third-party list refresh.
//!
//! Configured player and rule list URLs are downloaded once at startup
//! and imported into the rule engine. A list that fails to download or
//! parse is logged and skipped; the local lists and every other
//! subscription are unaffected.

use reqwest::Client;
use spycheck_rules::{PlayerListSchema, RuleEngine, RuleSchema};
use tracing::{error, info};

use crate::settings::{ListConfig, ListKind};

/// Download and import every enabled subscription.
pub async fn refresh(client: &Client, rules: &RuleEngine, lists: &[ListConfig]) {
    for list in lists.iter().filter(|l| l.enabled) {
        match import_one(client, rules, list).await {
            Ok(imported) => {
                info!(url = %list.url, count = imported, "imported list");
            }
            Err(err) => {
                error!(url = %list.url, error = %err, "list refresh failed");
            }
        }
    }
}

async fn import_one(
    client: &Client,
    rules: &RuleEngine,
    list: &ListConfig,
) -> Result<usize, RefreshError> {
    let response = client.get(&list.url).send().await?;
    if !response.status().is_success() {
        return Err(RefreshError::Status(response.status()));
    }
    let imported = match list.kind {
        ListKind::Players => {
            let schema: PlayerListSchema = response.json().await?;
            rules.import_players(schema)
        }
        ListKind::Rules => {
            let schema: RuleSchema = response.json().await?;
            rules.import_rules(schema)?
        }
    };
    Ok(imported)
}

#[derive(Debug, thiserror::Error)]
enum RefreshError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Import(#[from] spycheck_rules::RulesError),
}
