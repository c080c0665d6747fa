//! Data models for atrium-link.
//!
//! Request and response structures for the auth, table and storage APIs and
//! the realtime socket.

pub mod bucket;
pub mod change_event;
pub mod change_filter;
pub mod credentials;
pub mod error_detail;
pub mod health_check_response;
pub mod phoenix_message;
pub mod row;
pub mod row_filter;
pub mod session;
pub mod storage_object;
pub mod user;

#[cfg(test)]
mod tests;

pub use bucket::{Bucket, BucketOptions};
pub use change_event::{ChangeEvent, ChangeKind};
pub use change_filter::{ChangeFilter, EventFilter, DEFAULT_SCHEMA};
pub use credentials::{RecoverRequest, SignInRequest, SignUpRequest, UpdateUserRequest};
pub use error_detail::ErrorDetail;
pub use health_check_response::HealthCheckResponse;
pub use phoenix_message::{
    channel_topic, JoinPayload, PhoenixMessage, PostgresChangeData, PostgresChangesPayload,
    ReplyPayload,
};
pub use row::{into_row, row_identity, Row, DEFAULT_IDENTITY_KEY};
pub use row_filter::{FilterOp, RowFilter};
pub use session::{jwt_expiry, Session};
pub use storage_object::{ListOptions, ListRequest, SortBy, SortColumn, StorageObject, UploadResponse};
pub use user::User;
