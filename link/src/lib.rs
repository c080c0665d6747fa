//! # atrium-link
//!
//! Client library for the Atrium hosted platform: account auth, REST table
//! queries, object storage and realtime row-change channels, plus
//! [`LiveTable`], an in-memory mirror of a table kept current from a channel.
//!
//! ```rust,no_run
//! use atrium_link::{AtriumClient, EventFilter, LiveTable, LiveTableOptions};
//!
//! # async fn example() -> atrium_link::Result<()> {
//! let client = AtriumClient::from_env()?;
//! let mut messages = LiveTable::open(
//!     &client,
//!     "messages",
//!     EventFilter::All,
//!     None,
//!     LiveTableOptions::default(),
//! )
//! .await?;
//!
//! while let Some(change) = messages.next_change().await {
//!     let (event, _) = change?;
//!     println!("{:?} -> {} rows", event.kind(), messages.rows().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod event_handlers;
pub mod live;
pub mod models;
pub mod query;
pub mod realtime;
pub mod storage;
pub mod timeouts;
pub mod upload_policy;

mod transport;

pub use auth::{api::SignUpOutcome, AuthApi, AuthProvider};
pub use client::{AtriumClient, AtriumClientBuilder};
pub use config::PlatformConfig;
pub use error::{AtriumLinkError, Result};
pub use event_handlers::{DisconnectReason, EventHandlers, RealtimeError};
pub use live::{Applied, ChangeFeed, ChangeStream, LiveRows, LiveTable, LiveTableOptions};
pub use models::{
    Bucket, BucketOptions, ChangeEvent, ChangeFilter, ChangeKind, EventFilter, FilterOp,
    HealthCheckResponse, ListOptions, Row, RowFilter, Session, StorageObject, User,
};
pub use query::TableQuery;
pub use realtime::RealtimeChannel;
pub use storage::{BucketProvision, StorageAdmin, StorageBucket, UploadOptions};
pub use timeouts::{LinkTimeouts, LinkTimeoutsBuilder};
pub use upload_policy::UploadPolicy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
