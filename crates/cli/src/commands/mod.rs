//! Command implementations.

pub mod cart;
pub mod catalog;
pub mod wishlist;

use std::sync::Arc;

use np_commerce_core::SelectedOptions;
use np_commerce_sync::{
    CartError, CatalogError, FileStore, HttpRemote, InvalidationBus, RemoteError, SyncConfig,
    Synchronizer,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// Errors that end a command with a non-zero exit.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Remote client error: {0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Cart(#[from] CartError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

/// Synchronizer over the HTTP remote and the on-disk store.
pub fn synchronizer(config: &SyncConfig) -> Result<Synchronizer<HttpRemote>, CliError> {
    let remote = HttpRemote::new(config.api_base_url.clone())?;
    let store = FileStore::in_dir(&config.data_dir, &config.options.namespace);
    debug!(path = %store.path().display(), "Using local store");

    Ok(
        Synchronizer::new(remote, Arc::new(store), InvalidationBus::new(), &config.options)
            .with_identity(config.identity.clone()),
    )
}

/// Parse `name=value` for `--option`.
pub fn parse_option(raw: &str) -> Result<(String, String), String> {
    SelectedOptions::parse_pair(raw).map_err(|e| e.to_string())
}

/// Parse `name=amount` for `--option-price`.
pub fn parse_option_price(raw: &str) -> Result<(String, Decimal), String> {
    let (name, amount) = parse_option(raw)?;
    let amount = amount
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount for {name}: {e}"))?;
    Ok((name, amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("size=L").unwrap(),
            ("size".to_string(), "L".to_string())
        );
        assert!(parse_option("size").is_err());
    }

    #[test]
    fn test_parse_option_price() {
        assert_eq!(
            parse_option_price("size=5.00").unwrap(),
            ("size".to_string(), Decimal::new(500, 2))
        );
        assert!(parse_option_price("size=lots").is_err());
    }
}
