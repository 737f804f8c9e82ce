//! PostgREST client for the hosted database API
//!
//! Talks to `{project_url}/rest/v1/{table}` with the service-role key and
//! implements [`CatalogStore`] on top of it.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};

use qms_shared::{
    NewProduct, ProductCategory, ProductLabelUpdate, ProductRow, ReferenceRow, RowId, TableColumn,
};

use crate::config::SupabaseConfig;
use crate::error::{AppError, AppResult};
use crate::store::{CatalogStore, ReferencePage};

const PRODUCTS: &str = "products";
const PRODUCT_CATEGORIES: &str = "product_categories";

/// PostgREST API client
#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<Value>,
    hint: Option<Value>,
}

impl PostgrestErrorBody {
    fn describe(&self) -> String {
        let mut parts = vec![self.message.clone().unwrap_or_default()];
        for extra in [&self.details, &self.hint].into_iter().flatten() {
            match extra {
                Value::Null => {}
                Value::String(s) if s.is_empty() => {}
                Value::String(s) => parts.push(s.clone()),
                other => parts.push(other.to_string()),
            }
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" | ")
    }
}

impl PostgrestClient {
    /// Create a client for a project URL
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_base_url(
            format!("{}/rest/v1", config.url.trim().trim_end_matches('/')),
            config.service_key.clone(),
        )
    }

    /// Create a client against an explicit REST root (for testing)
    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn write(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=minimal")
    }

    /// Send a request and turn non-2xx answers into classified errors
    async fn send(&self, table: &str, request: RequestBuilder) -> AppResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(parse_error(table, status, &body))
    }

    async fn get_json<T>(&self, table: &str, query: &[(&str, String)]) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .send(table, self.request(Method::GET, table).query(query))
            .await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Classify a PostgREST error response
pub fn parse_error(table: &str, status: u16, body: &str) -> AppError {
    match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed.describe();
            AppError::from_backend(table, status, parsed.code, message)
        }
        Err(_) => AppError::from_backend(table, status, None, body.trim().to_string()),
    }
}

fn id_filter(id: &RowId) -> [(&'static str, String); 1] {
    [("id", format!("eq.{}", id))]
}

#[async_trait]
impl CatalogStore for PostgrestClient {
    async fn find_category_id(&self, category_code: &str) -> AppResult<RowId> {
        let categories: Vec<ProductCategory> = self
            .get_json(
                PRODUCT_CATEGORIES,
                &[
                    ("select", "id".to_string()),
                    ("category_code", format!("eq.{}", category_code)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        categories
            .into_iter()
            .next()
            .map(|c| c.id)
            .ok_or_else(|| AppError::CategoryNotFound(category_code.to_string()))
    }

    async fn list_products(&self, category_id: &RowId) -> AppResult<Vec<ProductRow>> {
        self.get_json(
            PRODUCTS,
            &[
                ("select", "id,product_code,product_name".to_string()),
                ("category_id", format!("eq.{}", category_id)),
                ("order", "id.asc".to_string()),
            ],
        )
        .await
    }

    async fn update_product_label(&self, id: &RowId, label: &str) -> AppResult<()> {
        let body = ProductLabelUpdate {
            product_code: label,
            product_name: label,
        };
        self.send(
            PRODUCTS,
            self.write(Method::PATCH, PRODUCTS)
                .query(&id_filter(id))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_product(&self, id: &RowId) -> AppResult<()> {
        self.send(
            PRODUCTS,
            self.write(Method::DELETE, PRODUCTS).query(&id_filter(id)),
        )
        .await?;
        Ok(())
    }

    async fn insert_product(&self, category_id: &RowId, label: &str) -> AppResult<()> {
        let body = NewProduct {
            product_code: label,
            product_name: label,
            category_id,
            part_number: None,
            is_active: true,
        };
        self.send(PRODUCTS, self.write(Method::POST, PRODUCTS).json(&body))
            .await?;
        Ok(())
    }

    async fn insert_part(&self, category_id: &RowId, code: &str) -> AppResult<()> {
        let body = NewProduct {
            product_code: code,
            product_name: code,
            category_id,
            part_number: Some(code),
            is_active: true,
        };
        self.send(PRODUCTS, self.write(Method::POST, PRODUCTS).json(&body))
            .await?;
        Ok(())
    }

    async fn fetch_reference_page(
        &self,
        target: &TableColumn,
        offset: usize,
        limit: usize,
    ) -> AppResult<ReferencePage> {
        let objects: Vec<Map<String, Value>> = self
            .get_json(
                &target.table,
                &[
                    ("select", format!("id,{}", target.column)),
                    (target.column.as_str(), "not.is.null".to_string()),
                    ("order", "id.asc".to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let returned = objects.len();
        let rows: Vec<ReferenceRow> = objects
            .into_iter()
            .filter_map(|object| ReferenceRow::from_json(object, &target.column))
            .collect();
        if rows.len() < returned {
            tracing::warn!(
                "{}: {} rows without a usable id were ignored",
                target,
                returned - rows.len()
            );
        }
        Ok(ReferencePage { rows, returned })
    }

    async fn update_reference(
        &self,
        target: &TableColumn,
        id: &RowId,
        value: &str,
    ) -> AppResult<()> {
        let mut body = Map::new();
        body.insert(target.column.clone(), Value::String(value.to_string()));

        self.send(
            &target.table,
            self.write(Method::PATCH, &target.table)
                .query(&id_filter(id))
                .json(&body),
        )
        .await?;
        Ok(())
    }
}
