//! `np-commerce categories`

use np_commerce_sync::{CatalogError, HttpRemote, Synchronizer};

use crate::output;

pub async fn categories(
    sync: &Synchronizer<HttpRemote>,
    refresh: bool,
) -> Result<(), CatalogError> {
    if refresh {
        sync.catalog().invalidate_categories().await;
    }
    let categories = sync.catalog().categories().await?;
    output::categories(&categories);
    Ok(())
}
