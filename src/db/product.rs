use crate::db::models::{FeedProduct, Product};
use crate::db::sqlite::{SqlitePool, Violation, violation};
use crate::db::storage::ProductStorage;
use crate::error::CatalogError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Rows per multi-row statement; keeps bind counts well under SQLite's variable limit.
const UPSERT_CHUNK: usize = 500;

/// Tables whose rows are keyed by a unique `name`.
#[derive(Debug, Clone, Copy)]
enum NamedTable {
    Category,
    Product,
}

impl NamedTable {
    fn as_str(self) -> &'static str {
        match self {
            NamedTable::Category => "category",
            NamedTable::Product => "product",
        }
    }
}

/// Distinct names of one feed page in first-seen order, plus one link per
/// product. A product listed twice keeps the last category it was listed under.
#[derive(Debug, Default)]
struct BatchPlan<'a> {
    categories: Vec<&'a str>,
    products: Vec<&'a str>,
    links: Vec<(&'a str, &'a str)>,
}

impl<'a> BatchPlan<'a> {
    fn from_items(items: &'a [FeedProduct]) -> Self {
        let mut seen_categories = HashSet::new();
        let mut link_index: HashMap<&'a str, usize> = HashMap::new();
        let mut plan = BatchPlan::default();

        for item in items {
            let product = item.product_name.as_str();
            let category = item.category_name.as_str();
            if seen_categories.insert(category) {
                plan.categories.push(category);
            }
            match link_index.get(product) {
                Some(&i) => plan.links[i].1 = category,
                None => {
                    link_index.insert(product, plan.links.len());
                    plan.products.push(product);
                    plan.links.push((product, category));
                }
            }
        }
        plan
    }
}

#[derive(Clone)]
pub struct SqliteProducts {
    pool: SqlitePool,
}

impl SqliteProducts {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Insert-or-touch every name and return the resolved id for each.
/// `DO UPDATE SET name = excluded.name` leaves existing rows unchanged but
/// makes `RETURNING` report them too.
async fn upsert_names(
    conn: &mut SqliteConnection,
    table: NamedTable,
    names: &[&str],
) -> Result<HashMap<String, i64>, sqlx::Error> {
    let mut ids = HashMap::with_capacity(names.len());
    for chunk in names.chunks(UPSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} (name) ", table.as_str()));
        qb.push_values(chunk, |mut row, name| {
            row.push_bind(name.to_string());
        });
        qb.push(" ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id, name");

        let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&mut *conn).await?;
        ids.extend(rows.into_iter().map(|(id, name)| (name, id)));
    }
    Ok(ids)
}

/// Associations that already exist are skipped.
async fn insert_links(conn: &mut SqliteConnection, links: &[(i64, i64)]) -> Result<(), sqlx::Error> {
    for chunk in links.chunks(UPSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO product_category (product_id, category_id) ");
        qb.push_values(chunk, |mut row, (product_id, category_id)| {
            row.push_bind(*product_id).push_bind(*category_id);
        });
        qb.push(" ON CONFLICT DO NOTHING");
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn category_exists(conn: &mut SqliteConnection, category_id: i64) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM category WHERE id = ?)")
        .bind(category_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

fn resolve(ids: &HashMap<String, i64>, name: &str) -> Result<i64, sqlx::Error> {
    ids.get(name).copied().ok_or(sqlx::Error::RowNotFound)
}

#[async_trait]
impl ProductStorage for SqliteProducts {
    async fn reconcile_batch(&self, items: &[FeedProduct]) -> Result<(), CatalogError> {
        if items.is_empty() {
            debug!("empty feed batch; nothing to reconcile");
            return Ok(());
        }
        let plan = BatchPlan::from_items(items);

        let mut tx = self.pool.begin().await.inspect_err(|e| {
            error!(error = %e, "error beginning reconcile transaction");
        })?;

        let category_ids = upsert_names(&mut tx, NamedTable::Category, &plan.categories)
            .await
            .inspect_err(|e| error!(error = %e, "error upserting categories"))?;
        let product_ids = upsert_names(&mut tx, NamedTable::Product, &plan.products)
            .await
            .inspect_err(|e| error!(error = %e, "error upserting products"))?;

        let links = plan
            .links
            .iter()
            .map(|(product, category)| -> Result<(i64, i64), sqlx::Error> {
                Ok((resolve(&product_ids, product)?, resolve(&category_ids, category)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        insert_links(&mut tx, &links)
            .await
            .inspect_err(|e| error!(error = %e, "error inserting into product_category"))?;

        tx.commit()
            .await
            .inspect_err(|e| error!(error = %e, "error committing reconcile transaction"))?;

        info!(
            products = plan.products.len(),
            categories = plan.categories.len(),
            links = links.len(),
            "feed batch reconciled"
        );
        Ok(())
    }

    async fn add_product(&self, name: &str, category_id: i64) -> Result<Product, CatalogError> {
        // Take the write lock up front; a read-then-write upgrade fails with
        // SQLITE_BUSY instead of waiting out busy_timeout.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        if !category_exists(&mut tx, category_id).await? {
            return Err(CatalogError::CategoryNotFound);
        }

        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO product (name) VALUES (?) ON CONFLICT(name) DO NOTHING RETURNING id",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(id) = id else {
            return Err(CatalogError::AlreadyExists);
        };

        sqlx::query("INSERT INTO product_category (product_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| error!(error = %e, "error inserting into product_category"))?;

        tx.commit().await?;
        debug!(id, name, category_id, "product added");
        Ok(Product {
            id,
            name: name.to_string(),
        })
    }

    async fn products_by_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError> {
        let mut tx = self.pool.begin().await?;

        if !category_exists(&mut tx, category_id).await? {
            return Err(CatalogError::CategoryNotFound);
        }

        let products: Vec<Product> = sqlx::query_as(
            r#"SELECT p.id, p.name
               FROM product p
               JOIN product_category pc ON pc.product_id = p.id
               WHERE pc.category_id = ?
               ORDER BY p.id"#,
        )
        .bind(category_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(products)
    }

    async fn rename_product(&self, id: i64, new_name: &str) -> Result<(), CatalogError> {
        let res = sqlx::query("UPDATE product SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(Violation::Unique) => CatalogError::AlreadyExists,
                _ => e.into(),
            })?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    async fn recategorize_product(
        &self,
        product_id: i64,
        old_category_id: i64,
        new_category_id: i64,
    ) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            "UPDATE product_category SET category_id = ? WHERE product_id = ? AND category_id = ?",
        )
        .bind(new_category_id)
        .bind(product_id)
        .bind(old_category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique) => CatalogError::AlreadyExists,
            Some(Violation::ForeignKey) => CatalogError::CategoryNotFound,
            None => e.into(),
        })?;
        if res.rows_affected() == 0 {
            debug!(product_id, old_category_id, "product with that category not found");
            return Err(CatalogError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        let res = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}
