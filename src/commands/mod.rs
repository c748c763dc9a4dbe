mod list;
mod reconcile;
mod serve;
mod validate;

pub use list::run_list;
pub use reconcile::run_reconcile;
pub use serve::run_serve;
pub use validate::run_validate;

use container_warden::{Config, DockerRuntime, SqliteStateStore};
use std::sync::Arc;

/// Open the state store and the Docker adapter described by `config`.
async fn open_backends(config: &Config) -> anyhow::Result<(Arc<SqliteStateStore>, Arc<DockerRuntime>)> {
    let store = SqliteStateStore::open(&config.database_path).await?;
    store.initialize().await?;
    let runtime = DockerRuntime::new().with_timeout(config.docker_timeout);
    Ok((Arc::new(store), Arc::new(runtime)))
}
