//! In-memory catalog store shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use qms_maintenance::error::{AppError, AppResult};
use qms_maintenance::services::StandardizationSettings;
use qms_maintenance::store::ReferencePage;
use qms_maintenance::CatalogStore;
use qms_shared::{
    default_part_registry, default_registry, ProductRow, ReferenceRow, RowId, TableColumn,
};

pub const CATEGORY_CODE: &str = "VEHICLE_TYPES";
pub const PARTS_CATEGORY_CODE: &str = "PARTS";

const PARTS_CATEGORY_ID: i64 = 2;
const PART_COLUMN: &str = "part_code";

#[derive(Default)]
struct State {
    category: Option<RowId>,
    parts_category: Option<RowId>,
    products: Vec<ProductRow>,
    /// Rows of the parts category as (id, code, part number)
    parts: Vec<(i64, String, Option<String>)>,
    next_id: i64,
    /// table -> rows as (id, value), ordered by id
    references: BTreeMap<String, Vec<(i64, Option<String>)>>,
    /// table -> `part_code` column rows as (id, value), ordered by id
    part_codes: BTreeMap<String, Vec<(i64, Option<String>)>>,
    writes: usize,
}

/// Catalog store backed by vectors, with failure injection
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    missing_tables: HashSet<String>,
    unreadable_tables: HashSet<String>,
    failing_rows: HashSet<(String, i64)>,
    failing_products: HashSet<i64>,
    /// Labels the backend rejects with a unique violation on insert
    unique_labels: HashSet<String>,
    /// Server-side row limit per response
    page_cap: Option<usize>,
    /// Rows per table returned ahead of the real ones but lacking a usable id
    idless_rows: BTreeMap<String, usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.category = Some(RowId::Int(1));
            state.parts_category = Some(RowId::Int(PARTS_CATEGORY_ID));
            state.next_id = 100;
        }
        store
    }

    pub fn without_category() -> Self {
        Self::default()
    }

    /// Catalog row with both label columns set to `label`
    pub fn with_product(self, id: i64, label: &str) -> Self {
        self.with_product_columns(id, Some(label), Some(label))
    }

    pub fn with_product_columns(self, id: i64, code: Option<&str>, name: Option<&str>) -> Self {
        self.state.lock().unwrap().products.push(ProductRow {
            id: RowId::Int(id),
            product_code: code.map(str::to_string),
            product_name: name.map(str::to_string),
        });
        self
    }

    pub fn with_part(self, id: i64, code: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .parts
            .push((id, code.to_string(), Some(code.to_string())));
        self
    }

    pub fn without_parts_category(self) -> Self {
        self.state.lock().unwrap().parts_category = None;
        self
    }

    pub fn with_reference(self, table: &str, id: i64, value: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let rows = state.references.entry(table.to_string()).or_default();
            rows.push((id, value.map(str::to_string)));
            rows.sort_by_key(|(id, _)| *id);
        }
        self
    }

    pub fn with_part_code(self, table: &str, id: i64, value: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let rows = state.part_codes.entry(table.to_string()).or_default();
            rows.push((id, value.map(str::to_string)));
            rows.sort_by_key(|(id, _)| *id);
        }
        self
    }

    pub fn with_missing_table(mut self, table: &str) -> Self {
        self.missing_tables.insert(table.to_string());
        self
    }

    pub fn with_unreadable_table(mut self, table: &str) -> Self {
        self.unreadable_tables.insert(table.to_string());
        self
    }

    pub fn with_failing_row(mut self, table: &str, id: i64) -> Self {
        self.failing_rows.insert((table.to_string(), id));
        self
    }

    pub fn with_failing_product(mut self, id: i64) -> Self {
        self.failing_products.insert(id);
        self
    }

    pub fn with_unique_label(mut self, label: &str) -> Self {
        self.unique_labels.insert(label.to_string());
        self
    }

    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap);
        self
    }

    pub fn with_idless_rows(mut self, table: &str, count: usize) -> Self {
        self.idless_rows.insert(table.to_string(), count);
        self
    }

    pub fn products(&self) -> Vec<ProductRow> {
        self.state.lock().unwrap().products.clone()
    }

    pub fn product_labels(&self) -> Vec<String> {
        self.products()
            .into_iter()
            .filter_map(|p| p.product_name)
            .collect()
    }

    /// Parts category rows as (code, part number)
    pub fn parts(&self) -> Vec<(String, Option<String>)> {
        self.state
            .lock()
            .unwrap()
            .parts
            .iter()
            .map(|(_, code, number)| (code.clone(), number.clone()))
            .collect()
    }

    /// Stored values of `table`, ordered by id
    pub fn values(&self, table: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .references
            .get(table)
            .map(|rows| rows.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of successful write calls
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    fn check_table(&self, table: &str) -> AppResult<()> {
        if self.missing_tables.contains(table) {
            return Err(AppError::MissingTable(table.to_string()));
        }
        Ok(())
    }
}

fn backend_error(message: &str) -> AppError {
    AppError::Backend {
        status: 500,
        code: None,
        message: message.to_string(),
    }
}

fn int_id(id: &RowId) -> i64 {
    match id {
        RowId::Int(value) => *value,
        other => panic!("unexpected id {other}"),
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_category_id(&self, category_code: &str) -> AppResult<RowId> {
        let state = self.state.lock().unwrap();
        let category = if category_code == PARTS_CATEGORY_CODE {
            &state.parts_category
        } else {
            &state.category
        };
        category
            .clone()
            .ok_or_else(|| AppError::CategoryNotFound(category_code.to_string()))
    }

    async fn list_products(&self, category_id: &RowId) -> AppResult<Vec<ProductRow>> {
        if *category_id == RowId::Int(PARTS_CATEGORY_ID) {
            let state = self.state.lock().unwrap();
            return Ok(state
                .parts
                .iter()
                .map(|(id, code, _)| ProductRow {
                    id: RowId::Int(*id),
                    product_code: Some(code.clone()),
                    product_name: Some(code.clone()),
                })
                .collect());
        }
        Ok(self.products())
    }

    async fn update_product_label(&self, id: &RowId, label: &str) -> AppResult<()> {
        let id = int_id(id);
        if self.failing_products.contains(&id) {
            return Err(backend_error("rename rejected"));
        }
        let mut state = self.state.lock().unwrap();
        if state.products.iter().any(|p| {
            int_id(&p.id) != id && p.product_code.as_deref() == Some(label)
        }) {
            return Err(AppError::DuplicateEntry(label.to_string()));
        }
        let row = state
            .products
            .iter_mut()
            .find(|p| int_id(&p.id) == id)
            .ok_or_else(|| backend_error("no such product"))?;
        row.product_code = Some(label.to_string());
        row.product_name = Some(label.to_string());
        state.writes += 1;
        Ok(())
    }

    async fn delete_product(&self, id: &RowId) -> AppResult<()> {
        let id = int_id(id);
        if self.failing_products.contains(&id) {
            return Err(backend_error("delete rejected"));
        }
        let mut state = self.state.lock().unwrap();
        state.products.retain(|p| int_id(&p.id) != id);
        state.writes += 1;
        Ok(())
    }

    async fn insert_product(&self, _category_id: &RowId, label: &str) -> AppResult<()> {
        if self.unique_labels.contains(label) {
            return Err(AppError::DuplicateEntry(label.to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.products.push(ProductRow {
            id: RowId::Int(id),
            product_code: Some(label.to_string()),
            product_name: Some(label.to_string()),
        });
        state.writes += 1;
        Ok(())
    }

    async fn insert_part(&self, category_id: &RowId, code: &str) -> AppResult<()> {
        assert_eq!(*category_id, RowId::Int(PARTS_CATEGORY_ID));
        if self.unique_labels.contains(code) {
            return Err(AppError::DuplicateEntry(code.to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.parts.push((id, code.to_string(), Some(code.to_string())));
        state.writes += 1;
        Ok(())
    }

    async fn fetch_reference_page(
        &self,
        target: &TableColumn,
        offset: usize,
        limit: usize,
    ) -> AppResult<ReferencePage> {
        self.check_table(&target.table)?;
        if self.unreadable_tables.contains(&target.table) {
            return Err(backend_error("connection reset"));
        }
        let limit = self.page_cap.map_or(limit, |cap| limit.min(cap));
        let idless = self.idless_rows.get(&target.table).copied().unwrap_or(0);

        let state = self.state.lock().unwrap();
        let columns = if target.column == PART_COLUMN {
            &state.part_codes
        } else {
            &state.references
        };
        let stored = columns
            .get(&target.table)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, value)| value.is_some())
                    .map(|(id, value)| Some(ReferenceRow::new(*id, value.as_deref())))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let page: Vec<Option<ReferenceRow>> = std::iter::repeat(None)
            .take(idless)
            .chain(stored)
            .skip(offset)
            .take(limit)
            .collect();
        Ok(ReferencePage {
            returned: page.len(),
            rows: page.into_iter().flatten().collect(),
        })
    }

    async fn update_reference(&self, target: &TableColumn, id: &RowId, value: &str) -> AppResult<()> {
        self.check_table(&target.table)?;
        let id = int_id(id);
        if self.failing_rows.contains(&(target.table.clone(), id)) {
            return Err(backend_error("row locked"));
        }
        let mut state = self.state.lock().unwrap();
        let row = state
            .references
            .get_mut(&target.table)
            .and_then(|rows| rows.iter_mut().find(|(row_id, _)| *row_id == id))
            .ok_or_else(|| backend_error("no such row"))?;
        row.1 = Some(value.to_string());
        state.writes += 1;
        Ok(())
    }
}

pub fn settings(dry_run: bool) -> StandardizationSettings {
    StandardizationSettings {
        category_code: CATEGORY_CODE.to_string(),
        page_size: 1000,
        tables: default_registry(),
        dry_run,
        parts_category_code: "PARTS".to_string(),
        part_tables: default_part_registry(),
    }
}
