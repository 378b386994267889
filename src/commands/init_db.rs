use tracing::info;

use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    app.database.init_schema().await?;
    info!(
        "database ready, {count} pasties stored",
        count = app.database.count().await?
    );
    Ok(())
}
