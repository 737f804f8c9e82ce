//! Access to the remote vehicle-type catalog and its dependent tables

use async_trait::async_trait;

use qms_shared::{ProductRow, ReferenceRow, RowId, TableColumn};

use crate::error::AppResult;

/// One page of a dependent table
#[derive(Debug, Clone, Default)]
pub struct ReferencePage {
    pub rows: Vec<ReferenceRow>,
    /// Rows the backend returned, including any dropped for lacking a usable id
    pub returned: usize,
}

/// Row-level operations the standardization services need
///
/// Each call is a single remote request; implementations do not retry.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Id of the `product_categories` row with this code
    async fn find_category_id(&self, category_code: &str) -> AppResult<RowId>;

    /// Catalog rows of a category, in storage order
    async fn list_products(&self, category_id: &RowId) -> AppResult<Vec<ProductRow>>;

    /// Set both `product_code` and `product_name` to `label`
    async fn update_product_label(&self, id: &RowId, label: &str) -> AppResult<()>;

    async fn delete_product(&self, id: &RowId) -> AppResult<()>;

    /// Insert an active catalog row labeled `label`
    async fn insert_product(&self, category_id: &RowId, label: &str) -> AppResult<()>;

    /// Insert an active parts row whose code, name and part number are `code`
    async fn insert_part(&self, category_id: &RowId, code: &str) -> AppResult<()>;

    /// Rows of `target.table` whose `target.column` is not null, ordered by id
    ///
    /// The backend may return fewer than `limit` rows even when more remain.
    async fn fetch_reference_page(
        &self,
        target: &TableColumn,
        offset: usize,
        limit: usize,
    ) -> AppResult<ReferencePage>;

    async fn update_reference(&self, target: &TableColumn, id: &RowId, value: &str)
        -> AppResult<()>;
}

/// Collect every non-null row of a dependent table, one page at a time
///
/// Only an empty page ends the scan: a server-side row cap can shorten any
/// page, so the offset advances by what was actually returned.
pub async fn fetch_all_references<S: CatalogStore + ?Sized>(
    store: &S,
    target: &TableColumn,
    page_size: usize,
) -> AppResult<Vec<ReferenceRow>> {
    let mut rows = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.fetch_reference_page(target, offset, page_size).await?;
        if page.returned == 0 {
            break;
        }
        offset += page.returned;
        rows.extend(page.rows);
        tracing::debug!("{}: fetched {} rows so far", target, rows.len());
    }

    Ok(rows)
}
