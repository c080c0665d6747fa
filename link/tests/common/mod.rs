//! In-memory change feed for exercising `LiveTable` without a platform.

#![allow(dead_code)]

use async_trait::async_trait;
use atrium_link::{AtriumLinkError, ChangeEvent, ChangeFeed, ChangeFilter, ChangeStream, Result, Row};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not a row: {}", other),
    }
}

pub fn insert(table: &str, value: Value) -> ChangeEvent {
    ChangeEvent::Insert {
        schema: "public".into(),
        table: table.into(),
        row: row(value),
        commit_timestamp: None,
    }
}

pub fn update(table: &str, value: Value) -> ChangeEvent {
    ChangeEvent::Update {
        schema: "public".into(),
        table: table.into(),
        row: row(value),
        old_row: Row::new(),
        commit_timestamp: None,
    }
}

pub fn delete(table: &str, old: Value) -> ChangeEvent {
    ChangeEvent::Delete {
        schema: "public".into(),
        table: table.into(),
        old_row: row(old),
        commit_timestamp: None,
    }
}

/// Feed whose seed is fixed and whose events are pushed by the test.
pub struct FakeFeed {
    seed: Result<Vec<Row>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Result<ChangeEvent>>>>,
    pub fetched: Mutex<Vec<ChangeFilter>>,
    pub subscribed: Mutex<Vec<ChangeFilter>>,
    /// Number of streams released, by `close()` or by drop
    pub released: Arc<AtomicUsize>,
}

impl FakeFeed {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self::with_seed(Ok(rows.into_iter().map(row).collect()))
    }

    pub fn failing(err: AtriumLinkError) -> Self {
        Self::with_seed(Err(err))
    }

    fn with_seed(seed: Result<Vec<Row>>) -> Self {
        Self {
            seed,
            sender: Mutex::new(None),
            fetched: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Deliver an event; false when no stream is listening any more.
    pub fn push(&self, event: ChangeEvent) -> bool {
        self.push_result(Ok(event))
    }

    pub fn push_error(&self, err: AtriumLinkError) -> bool {
        self.push_result(Err(err))
    }

    fn push_result(&self, item: Result<ChangeEvent>) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }

    /// End the stream from the feed side.
    pub fn hang_up(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for FakeFeed {
    async fn fetch_rows(&self, scope: &ChangeFilter) -> Result<Vec<Row>> {
        self.fetched.lock().unwrap().push(scope.clone());
        self.seed.clone()
    }

    async fn subscribe(&self, scope: &ChangeFilter) -> Result<Box<dyn ChangeStream>> {
        self.subscribed.lock().unwrap().push(scope.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        Ok(Box::new(FakeStream {
            rx,
            released: self.released.clone(),
            done: AtomicBool::new(false),
        }))
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<Result<ChangeEvent>>,
    released: Arc<AtomicUsize>,
    done: AtomicBool,
}

impl FakeStream {
    fn release(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ChangeStream for FakeStream {
    async fn next_event(&mut self) -> Option<Result<ChangeEvent>> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.rx.close();
        self.release();
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.release();
    }
}
