//! Table queries against the REST table API.
//!
//! A [`TableQuery`] is a builder: filter, order and paging calls never fail,
//! a malformed argument is remembered and returned by the terminal call
//! before any request is sent.

use crate::{
    error::{AtriumLinkError, Result},
    models::{FilterOp, Row, RowFilter},
    transport::Transport,
};
use log::debug;
use reqwest::Method;
use serde::Serialize;

/// Builder for one table request.
#[derive(Clone)]
pub struct TableQuery {
    transport: Transport,
    table: String,
    columns: String,
    filters: Vec<RowFilter>,
    order: Vec<(String, bool)>,
    offset: Option<u64>,
    limit: Option<u64>,
    error: Option<AtriumLinkError>,
}

impl TableQuery {
    pub(crate) fn new(transport: Transport, table: &str) -> Self {
        let error = if is_identifier(table) {
            None
        } else {
            Some(AtriumLinkError::ValidationError(format!("Invalid table name '{}'", table)))
        };
        Self {
            transport,
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            error,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns to return, e.g. `"id,title,author:profiles(name)"`. Defaults to `*`.
    pub fn select(mut self, columns: &str) -> Self {
        let columns = columns.trim();
        if columns.is_empty() {
            self.remember(AtriumLinkError::ValidationError("select() needs at least one column".into()));
        } else {
            self.columns = columns.to_string();
        }
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }

    fn push_filter(mut self, column: &str, op: FilterOp, value: String) -> Self {
        match RowFilter::new(column, op, value) {
            Ok(filter) => self.filters.push(filter),
            Err(e) => self.remember(e),
        }
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Eq, value.to_string())
    }

    pub fn neq(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Neq, value.to_string())
    }

    pub fn gt(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Gt, value.to_string())
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Gte, value.to_string())
    }

    pub fn lt(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Lt, value.to_string())
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.push_filter(column, FilterOp::Lte, value.to_string())
    }

    /// SQL `LIKE`; `*` may be used in place of `%`.
    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.push_filter(column, FilterOp::Like, pattern.to_string())
    }

    pub fn is_in<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match RowFilter::one_of(column, values) {
            Ok(filter) => self.filters.push(filter),
            Err(e) => self.remember(e),
        }
        self
    }

    /// Append an ordering term. Later calls break ties of earlier ones.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        if is_identifier(column) {
            self.order.push((column.to_string(), ascending));
        } else {
            self.remember(AtriumLinkError::ValidationError(format!(
                "Invalid order column '{}'",
                column
            )));
        }
        self
    }

    /// Rows `from..=to`, zero-based and inclusive. `to == u64::MAX` reads
    /// everything from `from` on.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        if to < from {
            self.remember(AtriumLinkError::ValidationError(format!(
                "Invalid range {}..={}",
                from, to
            )));
            return self;
        }
        self.offset = Some(from);
        self.limit = (to - from).checked_add(1);
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    fn remember(&mut self, err: AtriumLinkError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Query-string pairs for a read.
    pub(crate) fn read_params(&self) -> Result<Vec<(String, String)>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, asc)| format!("{}.{}", column, if *asc { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        Ok(params)
    }

    /// Query-string pairs for a write: filters only.
    fn write_params(&self, verb: &str) -> Result<Vec<(String, String)>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.filters.is_empty() {
            return Err(AtriumLinkError::ValidationError(format!(
                "{} on '{}' needs at least one filter",
                verb, self.table
            )));
        }
        Ok(self.filter_params().collect())
    }

    fn filter_params(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.filters.iter().map(RowFilter::to_query_pair)
    }

    fn path(&self) -> String {
        self.transport.url(&format!("/rest/v1/{}", self.table))
    }

    /// Fetch all matching rows.
    pub async fn execute(&self) -> Result<Vec<Row>> {
        let params = self.read_params()?;
        self.fetch(params).await
    }

    /// Exactly one matching row; `NotFound` for none.
    pub async fn single(&self) -> Result<Row> {
        match self.maybe_single().await? {
            Some(row) => Ok(row),
            None => Err(AtriumLinkError::NotFound(format!("No row in '{}' matched", self.table))),
        }
    }

    /// Zero or one matching row; more than one is an error.
    pub async fn maybe_single(&self) -> Result<Option<Row>> {
        let mut params = self.read_params()?;
        if self.limit.is_none() {
            params.push(("limit".to_string(), "2".to_string()));
        }
        let mut rows = self.fetch(params).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(AtriumLinkError::ValidationError(format!(
                "Expected at most one row from '{}', got {}",
                self.table, n
            ))),
        }
    }

    async fn fetch(&self, params: Vec<(String, String)>) -> Result<Vec<Row>> {
        let url = self.path();
        let auth = self.transport.auth()?;
        debug!("[LINK_TABLE] GET {} params={:?}", self.table, params);
        self.transport
            .send_json(&format!("GET {}", self.table), true, || {
                auth.apply_to_request(self.transport.http().get(&url)).query(&params)
            })
            .await
    }

    /// Insert one row or an array of rows; returns the stored rows.
    pub async fn insert<T: Serialize + ?Sized>(&self, rows: &T) -> Result<Vec<Row>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let body = serde_json::to_value(rows)?;
        self.write(Method::POST, "insert", Vec::new(), Some(body)).await
    }

    /// Patch every row matching the filters; returns the updated rows.
    pub async fn update<T: Serialize + ?Sized>(&self, patch: &T) -> Result<Vec<Row>> {
        let params = self.write_params("update")?;
        let body = serde_json::to_value(patch)?;
        self.write(Method::PATCH, "update", params, Some(body)).await
    }

    /// Delete every row matching the filters; returns the deleted rows.
    pub async fn delete(&self) -> Result<Vec<Row>> {
        let params = self.write_params("delete")?;
        self.write(Method::DELETE, "delete", params, None).await
    }

    async fn write(
        &self,
        method: Method,
        verb: &str,
        params: Vec<(String, String)>,
        body: Option<serde_json::Value>,
    ) -> Result<Vec<Row>> {
        let url = self.path();
        let auth = self.transport.auth()?;
        let label = format!("{} {}", verb, self.table);
        debug!("[LINK_TABLE] {}", label);

        let rows: serde_json::Value = self
            .transport
            .send_json(&label, false, || {
                let mut req = auth
                    .apply_to_request(self.transport.http().request(method.clone(), &url))
                    .header("Prefer", "return=representation")
                    .query(&params);
                if let Some(body) = &body {
                    req = req.json(body);
                }
                req
            })
            .await?;

        match rows {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(row) => Ok(row),
                    other => Err(AtriumLinkError::SerializationError(format!(
                        "Expected row object, got {}",
                        other
                    ))),
                })
                .collect(),
            serde_json::Value::Object(row) => Ok(vec![row]),
            serde_json::Value::Null => Ok(Vec::new()),
            other => Err(AtriumLinkError::SerializationError(format!(
                "Unexpected {} response: {}",
                verb, other
            ))),
        }
    }
}

impl std::fmt::Debug for TableQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableQuery")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("filters", &self.filters)
            .field("order", &self.order)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
