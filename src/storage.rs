// ABOUTME: SeaORM storage layer owning the connection pool and running migrations
// ABOUTME: Provides the generic repository contract: live lookups, pagination and soft delete

use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, Select,
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::migration::Migrator;

pub struct Storage {
    pub db: DatabaseConnection,
}

impl Storage {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options.sqlx_logging(false);

        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;
        tracing::info!(database_url, "Storage ready");

        Ok(Self { db })
    }

    /// Closes every pooled connection. Clones of the connection share the
    /// pool, so this is effective even while `Storage` is still shared.
    pub async fn close(&self) -> Result<(), DbErr> {
        self.db.clone().close().await
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Entities carrying the standard identity, timestamp and soft-delete columns.
pub trait SoftDelete: EntityTrait {
    fn id_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
}

/// Default query scope: everything not soft-deleted.
pub fn live<E: SoftDelete>() -> Select<E> {
    E::find().filter(E::deleted_at_column().is_null())
}

pub async fn find_live<E, C>(db: &C, id: Uuid) -> Result<Option<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    live::<E>().filter(E::id_column().eq(id)).one(db).await
}

/// Looks a row up regardless of its soft-delete marker. Reserved for
/// restore paths.
pub async fn find_any<E, C>(db: &C, id: Uuid) -> Result<Option<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    E::find().filter(E::id_column().eq(id)).one(db).await
}

/// Marks a live row deleted. Returns `false` when no live row matched.
pub async fn soft_delete<E, C>(db: &C, id: Uuid) -> Result<bool, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let now = now_millis();
    let result = E::update_many()
        .col_expr(E::deleted_at_column(), Expr::value(now))
        .col_expr(E::updated_at_column(), Expr::value(now))
        .filter(E::id_column().eq(id))
        .filter(E::deleted_at_column().is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Clears the soft-delete marker. Returns `false` when no deleted row matched.
pub async fn restore<E, C>(db: &C, id: Uuid) -> Result<bool, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(E::deleted_at_column(), Expr::value(Option::<i64>::None))
        .col_expr(E::updated_at_column(), Expr::value(now_millis()))
        .filter(E::id_column().eq(id))
        .filter(E::deleted_at_column().is_not_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total_pages(total, request.limit),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}

/// Row offset of the first item on `request`'s page, if it is addressable.
/// SQLite offsets are signed 64-bit, so anything past `i64::MAX` is not.
pub fn page_offset(request: PageRequest) -> Option<u64> {
    request
        .page
        .checked_sub(1)?
        .checked_mul(request.limit)
        .filter(|offset| *offset <= i64::MAX as u64)
}

pub async fn paginate<E, C>(
    db: &C,
    select: Select<E>,
    request: PageRequest,
) -> crate::error::Result<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Sync,
    C: ConnectionTrait,
{
    if page_offset(request).is_none() {
        return Err(AppError::field(
            "page",
            format!("page {} is out of range", request.page),
            "out_of_range",
        ));
    }

    let paginator = select.paginate(db, request.limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page - 1).await?;

    Ok(Page::new(items, total, request))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(15, 10), 2);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(21, 10), 3);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn second_page_of_fifteen() {
        let page = Page::new(vec![0; 5], 15, PageRequest { page: 2, limit: 10 });
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next());
        assert!(page.has_prev());

        let first = Page::new(vec![0; 10], 15, PageRequest { page: 1, limit: 10 });
        assert!(first.has_next());
        assert!(!first.has_prev());
    }

    #[test]
    fn page_offset_stays_addressable() {
        assert_eq!(page_offset(PageRequest { page: 1, limit: 100 }), Some(0));
        assert_eq!(page_offset(PageRequest { page: 3, limit: 10 }), Some(20));
        assert_eq!(page_offset(PageRequest { page: 0, limit: 10 }), None);
        assert_eq!(
            page_offset(PageRequest {
                page: i64::MAX as u64,
                limit: 100
            }),
            None
        );
        assert_eq!(
            page_offset(PageRequest {
                page: u64::MAX,
                limit: 1
            }),
            None
        );
    }
}
