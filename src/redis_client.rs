use redis::aio::ConnectionManager;
use tracing::info;

use crate::store::StoreError;

/// Creates a single `ConnectionManager` that auto-reconnects on failure.
///
/// `ConnectionManager` is cheaply cloneable; every clone shares the same
/// underlying multiplexed TCP connection, which is plenty for a handful of
/// collectors writing once a minute.
pub async fn connect(url: &str) -> Result<ConnectionManager, StoreError> {
    let client = redis::Client::open(url)
        .map_err(|e| StoreError::Connection(format!("invalid Redis URL \"{url}\": {e}")))?;

    let conn = ConnectionManager::new(client)
        .await
        .map_err(|e| StoreError::Connection(format!("cannot connect to {url}: {e}")))?;

    info!(%url, "connected to redis");
    Ok(conn)
}
