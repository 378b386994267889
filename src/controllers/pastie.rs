use tracing::info;

use crate::db::Database;
use crate::types::{NewPastie, Pastie, PastieFilter, PastieUpdate};

pub async fn list(db: &Database) -> crate::ApiResult<Vec<Pastie>> {
    Ok(db.list(&PastieFilter::default(), None).await?)
}

pub async fn fetch(db: &Database, id: i64) -> crate::ApiResult<Pastie> {
    db.get(id).await?.ok_or(crate::ApiError::NotFound)
}

pub async fn create(db: &Database, user: &str, content: String) -> crate::ApiResult<Pastie> {
    let size = content.len();
    let pastie = db.create(NewPastie::with_content(content)).await?;

    info!("new pastie: id={}, user='{user}', size={size}", pastie.id);

    Ok(pastie)
}

pub async fn update(
    db: &Database,
    user: &str,
    id: i64,
    content: String,
) -> crate::ApiResult<Pastie> {
    let size = content.len();
    let pastie = db.update(id, PastieUpdate::with_content(content)).await?;

    info!("updated pastie: id={id}, user='{user}', size={size}");

    Ok(pastie)
}

pub async fn delete(db: &Database, user: &str, id: i64) -> crate::ApiResult<()> {
    if !db.delete(id).await? {
        return Err(crate::ApiError::NotFound);
    }

    info!("deleted pastie: id={id}, user='{user}'");

    Ok(())
}
