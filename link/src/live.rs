//! Live table mirror: an in-memory row list kept current by a realtime channel.
//!
//! [`LiveTable::open`] seeds the list with one bulk select, then opens a
//! channel scoped to the same table and row filter. The owner pulls changes
//! with [`LiveTable::next_change`]; each call applies exactly one event.
//! Nothing runs in the background on the table's behalf, so once it is
//! closed (or dropped) the rows can no longer change.
//!
//! Best effort: events committed between the seed and the channel join are
//! not replayed, and nothing reconciles the list against the backend later.

use crate::{
    client::AtriumClient,
    error::{AtriumLinkError, Result},
    models::{
        row_identity, ChangeEvent, ChangeFilter, EventFilter, Row, RowFilter, DEFAULT_IDENTITY_KEY,
        DEFAULT_SCHEMA,
    },
    realtime::RealtimeChannel,
};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of rows and row changes for a [`LiveTable`].
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// All visible rows of `scope.table` matching `scope.filter`.
    async fn fetch_rows(&self, scope: &ChangeFilter) -> Result<Vec<Row>>;

    /// Open a change stream for `scope`.
    async fn subscribe(&self, scope: &ChangeFilter) -> Result<Box<dyn ChangeStream>>;
}

/// An open change stream. Dropping it must release the underlying channel.
#[async_trait]
pub trait ChangeStream: Send {
    /// Next event, or `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<Result<ChangeEvent>>;

    /// Release the stream. A second call is a no-op.
    async fn close(&mut self) -> Result<()>;
}

static CHANNEL_SEQ: AtomicU64 = AtomicU64::new(1);

#[async_trait]
impl ChangeFeed for AtriumClient {
    async fn fetch_rows(&self, scope: &ChangeFilter) -> Result<Vec<Row>> {
        let mut query = self.from(&scope.table);
        if let Some(filter) = &scope.filter {
            query = query.filter(filter.clone());
        }
        query.execute().await
    }

    async fn subscribe(&self, scope: &ChangeFilter) -> Result<Box<dyn ChangeStream>> {
        let name = format!("live-{}-{}", scope.table, CHANNEL_SEQ.fetch_add(1, Ordering::Relaxed));
        let channel = self.channel(&name, scope.clone()).await?;
        Ok(Box::new(channel))
    }
}

#[async_trait]
impl ChangeStream for RealtimeChannel {
    async fn next_event(&mut self) -> Option<Result<ChangeEvent>> {
        self.next().await
    }

    async fn close(&mut self) -> Result<()> {
        RealtimeChannel::close(self).await
    }
}

/// What applying one event did to the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Appended at this index
    Inserted(usize),
    /// Replaced the row at this index
    Updated(usize),
    /// Removed the row that was at this index
    Deleted(usize),
    /// Out of scope, or no row with a matching identity
    Ignored,
}

/// Ordered rows of one table plus the rules for applying change events.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRows {
    rows: Vec<Row>,
    identity_key: String,
    scope: ChangeFilter,
}

impl LiveRows {
    pub fn new(rows: Vec<Row>, scope: ChangeFilter, identity_key: impl Into<String>) -> Self {
        Self {
            rows,
            identity_key: identity_key.into(),
            scope,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    pub fn scope(&self) -> &ChangeFilter {
        &self.scope
    }

    fn position(&self, identity: &serde_json::Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row_identity(row, &self.identity_key) == Some(identity))
    }

    /// Apply one event: insert appends, update replaces by identity, delete
    /// removes by the old row's identity. Misses change nothing.
    pub fn apply(&mut self, event: &ChangeEvent) -> Applied {
        if !self.scope.accepts(event.schema(), event.table(), event.kind()) {
            return Applied::Ignored;
        }

        match event {
            ChangeEvent::Insert { row, .. } => {
                self.rows.push(row.clone());
                Applied::Inserted(self.rows.len() - 1)
            },
            ChangeEvent::Update { row, .. } => {
                let Some(identity) = row_identity(row, &self.identity_key) else {
                    return Applied::Ignored;
                };
                match self.position(identity) {
                    Some(idx) => {
                        self.rows[idx] = row.clone();
                        Applied::Updated(idx)
                    },
                    None => Applied::Ignored,
                }
            },
            ChangeEvent::Delete { old_row, .. } => {
                let Some(identity) = row_identity(old_row, &self.identity_key) else {
                    return Applied::Ignored;
                };
                match self.position(identity) {
                    Some(idx) => {
                        self.rows.remove(idx);
                        Applied::Deleted(idx)
                    },
                    None => Applied::Ignored,
                }
            },
        }
    }
}

/// Options for [`LiveTable::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTableOptions {
    /// Column matching update/delete events to rows
    pub identity_key: String,
    pub schema: String,
}

impl Default for LiveTableOptions {
    fn default() -> Self {
        Self {
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl LiveTableOptions {
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

/// Rows of one table, seeded once and then kept current from a change stream.
pub struct LiveTable {
    rows: LiveRows,
    stream: Option<Box<dyn ChangeStream>>,
}

impl LiveTable {
    /// Seed the rows and open the change stream.
    ///
    /// A failed seed is returned as-is and no stream is opened.
    pub async fn open<F>(
        feed: &F,
        table: &str,
        event_filter: EventFilter,
        row_filter: Option<RowFilter>,
        options: LiveTableOptions,
    ) -> Result<Self>
    where
        F: ChangeFeed + ?Sized,
    {
        if table.trim().is_empty() {
            return Err(AtriumLinkError::ValidationError("Table name must not be empty".into()));
        }
        if options.identity_key.trim().is_empty() {
            return Err(AtriumLinkError::ValidationError("Identity key must not be empty".into()));
        }

        let mut scope = ChangeFilter::table(table)
            .with_event(event_filter)
            .with_schema(options.schema.as_str());
        if let Some(filter) = row_filter {
            scope = scope.with_filter(filter);
        }

        let seed = feed.fetch_rows(&scope).await?;
        debug!("[LIVE] Seeded {}.{} with {} row(s)", scope.schema, scope.table, seed.len());

        let stream = feed.subscribe(&scope).await?;
        info!("[LIVE] Watching {}.{} ({})", scope.schema, scope.table, scope.event);

        Ok(Self {
            rows: LiveRows::new(seed, scope, options.identity_key),
            stream: Some(stream),
        })
    }

    /// Receive and apply exactly one event.
    ///
    /// `None` once the table is closed or the stream has ended. A stream
    /// error is returned and leaves the rows untouched.
    pub async fn next_change(&mut self) -> Option<Result<(ChangeEvent, Applied)>> {
        let stream = self.stream.as_mut()?;
        match stream.next_event().await? {
            Ok(event) => {
                let applied = self.rows.apply(&event);
                if applied == Applied::Ignored {
                    debug!("[LIVE] Ignored {:?} on {}", event.kind(), event.table());
                }
                Some(Ok((event, applied)))
            },
            Err(e) => Some(Err(e)),
        }
    }

    pub fn rows(&self) -> &[Row] {
        self.rows.rows()
    }

    pub fn live_rows(&self) -> &LiveRows {
        &self.rows
    }

    pub fn scope(&self) -> &ChangeFilter {
        self.rows.scope()
    }

    /// Release the stream. Later calls are no-ops.
    pub async fn close(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(mut stream) => {
                debug!("[LIVE] Closing {}", self.rows.scope().table);
                stream.close().await
            },
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl std::fmt::Debug for LiveTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTable")
            .field("scope", self.rows.scope())
            .field("rows", &self.rows.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        crate::models::into_row(value).unwrap()
    }

    fn seeded() -> LiveRows {
        LiveRows::new(
            vec![row(json!({"id": 1, "v": "a"})), row(json!({"id": 2, "v": "b"}))],
            ChangeFilter::table("items"),
            "id",
        )
    }

    fn update(id: i64, v: &str) -> ChangeEvent {
        ChangeEvent::Update {
            schema: "public".into(),
            table: "items".into(),
            row: row(json!({"id": id, "v": v})),
            old_row: row(json!({"id": id})),
            commit_timestamp: None,
        }
    }

    fn delete(id: i64) -> ChangeEvent {
        ChangeEvent::Delete {
            schema: "public".into(),
            table: "items".into(),
            old_row: row(json!({"id": id})),
            commit_timestamp: None,
        }
    }

    #[test]
    fn test_update_then_delete() {
        let mut rows = seeded();
        assert_eq!(rows.apply(&update(2, "c")), Applied::Updated(1));
        assert_eq!(rows.rows(), &[row(json!({"id": 1, "v": "a"})), row(json!({"id": 2, "v": "c"}))]);

        assert_eq!(rows.apply(&delete(1)), Applied::Deleted(0));
        assert_eq!(rows.rows(), &[row(json!({"id": 2, "v": "c"}))]);
    }

    #[test]
    fn test_update_miss_is_dropped() {
        let mut rows = seeded();
        let before = rows.clone();
        assert_eq!(rows.apply(&update(9, "z")), Applied::Ignored);
        assert_eq!(rows, before);
        assert_eq!(rows.apply(&delete(9)), Applied::Ignored);
        assert_eq!(rows, before);
    }

    #[test]
    fn test_insert_appends_in_arrival_order() {
        let mut rows = seeded();
        for id in [3, 4] {
            rows.apply(&ChangeEvent::Insert {
                schema: "public".into(),
                table: "items".into(),
                row: row(json!({"id": id})),
                commit_timestamp: None,
            });
        }
        let ids: Vec<_> = rows.rows().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn test_out_of_scope_events_are_ignored() {
        let mut rows = LiveRows::new(
            vec![row(json!({"id": 1, "v": "a"}))],
            ChangeFilter::table("items").with_event(EventFilter::Insert),
            "id",
        );
        assert_eq!(rows.apply(&update(1, "x")), Applied::Ignored);

        let other_table = ChangeEvent::Delete {
            schema: "public".into(),
            table: "other".into(),
            old_row: row(json!({"id": 1})),
            commit_timestamp: None,
        };
        assert_eq!(rows.apply(&other_table), Applied::Ignored);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_custom_identity_key() {
        let mut rows = LiveRows::new(
            vec![row(json!({"slug": "intro", "title": "Hi"}))],
            ChangeFilter::table("items"),
            "slug",
        );
        let event = ChangeEvent::Update {
            schema: "public".into(),
            table: "items".into(),
            row: row(json!({"slug": "intro", "title": "Hello"})),
            old_row: Row::new(),
            commit_timestamp: None,
        };
        assert_eq!(rows.apply(&event), Applied::Updated(0));
        assert_eq!(rows.rows()[0]["title"], json!("Hello"));
    }
}
