use base64::{engine::general_purpose, Engine as _};
use serde_json::json;

use super::*;

fn jwt_with_claims(claims: serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.signature", header, payload)
}

fn sample_user() -> serde_json::Value {
    json!({
        "id": "8d0fd2b3-9ca7-4d9e-a95f-9e13dde3abfa",
        "aud": "authenticated",
        "role": "authenticated",
        "email": "ada@example.com",
        "user_metadata": {"full_name": "Ada", "role": "editor"},
        "app_metadata": {"provider": "email"},
        "email_confirmed_at": "2024-03-01T10:00:00Z",
        "created_at": "2024-03-01T09:59:00Z"
    })
}

// ==================== User / Session Tests ====================

#[test]
fn test_user_deserializes_platform_payload() {
    let user: User = serde_json::from_value(sample_user()).unwrap();

    assert_eq!(user.id, "8d0fd2b3-9ca7-4d9e-a95f-9e13dde3abfa");
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(user.metadata_str("full_name"), Some("Ada"));
    assert!(user.is_confirmed());
    assert!(user.last_sign_in_at.is_none());
}

#[test]
fn test_user_tolerates_missing_optional_fields() {
    let user: User = serde_json::from_value(json!({"id": "u1"})).unwrap();
    assert!(user.email.is_none());
    assert!(user.metadata_str("role").is_none());
    assert!(!user.is_confirmed());
}

#[test]
fn test_session_expiry_from_jwt_claim() {
    let token = jwt_with_claims(json!({"sub": "u1", "exp": 1_700_000_000}));
    let session: Session = serde_json::from_value(json!({
        "access_token": token,
        "refresh_token": "r1",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": sample_user()
    }))
    .unwrap();

    assert_eq!(session.expiry(), Some(1_700_000_000));
    assert!(!session.is_expired_at(1_699_999_999));
    assert!(session.is_expired_at(1_700_000_000));
}

#[test]
fn test_session_prefers_reported_expires_at() {
    let token = jwt_with_claims(json!({"exp": 10}));
    let session: Session = serde_json::from_value(json!({
        "access_token": token,
        "expires_at": 20,
        "user": {"id": "u1"}
    }))
    .unwrap();
    assert_eq!(session.expiry(), Some(20));
    assert_eq!(session.token_type, "bearer");
}

#[test]
fn test_unreadable_token_is_not_expired() {
    assert_eq!(jwt_expiry("not-a-jwt"), None);
    assert_eq!(jwt_expiry("a.%%%.c"), None);

    let session: Session = serde_json::from_value(json!({
        "access_token": "opaque",
        "user": {"id": "u1"}
    }))
    .unwrap();
    assert!(!session.is_expired_at(i64::MAX));
}

#[test]
fn test_session_debug_redacts_tokens() {
    let session: Session = serde_json::from_value(json!({
        "access_token": "secret-access",
        "refresh_token": "secret-refresh",
        "user": {"id": "u1"}
    }))
    .unwrap();
    let debug = format!("{:?}", session);
    assert!(!debug.contains("secret-access"));
    assert!(!debug.contains("secret-refresh"));
}

// ==================== Filter Tests ====================

#[test]
fn test_row_filter_round_trips_through_display() {
    let filter: RowFilter = "author_id=eq.42".parse().unwrap();
    assert_eq!(filter.column, "author_id");
    assert_eq!(filter.op, FilterOp::Eq);
    assert_eq!(filter.value, "42");
    assert_eq!(filter.to_string(), "author_id=eq.42");
    assert_eq!(filter.to_query_pair(), ("author_id".to_string(), "eq.42".to_string()));
}

#[test]
fn test_row_filter_value_may_contain_dots() {
    let filter: RowFilter = "email=eq.ada@example.com".parse().unwrap();
    assert_eq!(filter.value, "ada@example.com");
}

#[test]
fn test_row_filter_rejects_bad_input() {
    assert!("no-operator".parse::<RowFilter>().is_err());
    assert!("col=between.1".parse::<RowFilter>().is_err());
    assert!("bad col=eq.1".parse::<RowFilter>().is_err());
    assert!(RowFilter::eq("", "1").is_err());
}

#[test]
fn test_in_filter_formatting() {
    let filter = RowFilter::one_of("status", ["draft", "published"]).unwrap();
    assert_eq!(filter.to_realtime_filter().unwrap(), "status=in.(draft,published)");
}

#[test]
fn test_realtime_rejects_unsupported_operators() {
    let filter = RowFilter::new("title", FilterOp::Like, "%rust%").unwrap();
    assert!(matches!(
        filter.to_realtime_filter(),
        Err(crate::error::AtriumLinkError::ValidationError(_))
    ));
}

#[test]
fn test_event_filter_parsing_and_matching() {
    assert_eq!("insert".parse::<EventFilter>().unwrap(), EventFilter::Insert);
    assert_eq!("*".parse::<EventFilter>().unwrap(), EventFilter::All);
    assert!("upsert".parse::<EventFilter>().is_err());

    assert!(EventFilter::All.matches(ChangeKind::Delete));
    assert!(EventFilter::Update.matches(ChangeKind::Update));
    assert!(!EventFilter::Update.matches(ChangeKind::Insert));
}

#[test]
fn test_change_filter_scope() {
    let filter = ChangeFilter::table("messages").with_event(EventFilter::Insert);
    assert!(filter.accepts("public", "messages", ChangeKind::Insert));
    assert!(!filter.accepts("public", "messages", ChangeKind::Delete));
    assert!(!filter.accepts("public", "profiles", ChangeKind::Insert));
    assert!(!filter.accepts("private", "messages", ChangeKind::Insert));
}

// ==================== Wire Format Tests ====================

#[test]
fn test_join_payload_shape() {
    let filter = ChangeFilter::table("messages")
        .with_event(EventFilter::Update)
        .with_filter(RowFilter::eq("room_id", "7").unwrap());
    let payload = JoinPayload::for_filter(&filter, Some("jwt".into())).unwrap();

    assert_eq!(
        serde_json::to_value(&payload).unwrap(),
        json!({
            "config": {
                "postgres_changes": [
                    {"event": "UPDATE", "schema": "public", "table": "messages", "filter": "room_id=eq.7"}
                ]
            },
            "access_token": "jwt"
        })
    );
}

#[test]
fn test_postgres_changes_payload_decodes() {
    let payload: PostgresChangesPayload = serde_json::from_value(json!({
        "data": {
            "schema": "public",
            "table": "messages",
            "commit_timestamp": "2024-03-01T10:00:00Z",
            "type": "DELETE",
            "old_record": {"id": 3},
            "record": null,
            "columns": [{"name": "id", "type": "int8"}],
            "errors": null
        },
        "ids": [41]
    }))
    .unwrap();

    assert_eq!(payload.data.kind, ChangeKind::Delete);
    assert!(payload.data.record.is_none());
    assert_eq!(payload.data.old_record.unwrap().get("id"), Some(&json!(3)));
}

#[test]
fn test_phoenix_message_ref_is_renamed() {
    let msg = PhoenixMessage::heartbeat("5");
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["ref"], json!("5"));
    assert_eq!(value["topic"], json!("phoenix"));

    let decoded: PhoenixMessage =
        serde_json::from_str(r#"{"topic":"realtime:x","event":"phx_close","payload":{},"ref":null}"#)
            .unwrap();
    assert!(decoded.reference.is_none());
}

#[test]
fn test_reply_reason() {
    let reply: ReplyPayload = serde_json::from_value(json!({
        "status": "error",
        "response": {"reason": "Unauthorized"}
    }))
    .unwrap();
    assert!(!reply.is_ok());
    assert_eq!(reply.reason(), "Unauthorized");
}

// ==================== Error / Storage Tests ====================

#[test]
fn test_error_detail_prefers_most_specific_message() {
    assert_eq!(
        ErrorDetail::message_from_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(
        ErrorDetail::message_from_body(r#"{"code":"42P01","message":"relation does not exist"}"#),
        "relation does not exist"
    );
    assert_eq!(ErrorDetail::message_from_body(r#"{"msg":"User already registered"}"#), "User already registered");
    assert_eq!(ErrorDetail::message_from_body("Bad Gateway"), "Bad Gateway");
    assert_eq!(ErrorDetail::message_from_body("  "), "Unknown error");
}

#[test]
fn test_storage_object_metadata_helpers() {
    let file: StorageObject = serde_json::from_value(json!({
        "name": "hero.png",
        "id": "obj-1",
        "metadata": {"size": 2048, "mimetype": "image/png"}
    }))
    .unwrap();
    assert!(!file.is_folder());
    assert_eq!(file.size(), Some(2048));
    assert_eq!(file.mime_type(), Some("image/png"));

    let folder: StorageObject = serde_json::from_value(json!({"name": "avatars", "id": null})).unwrap();
    assert!(folder.is_folder());
    assert_eq!(folder.size(), None);
}

#[test]
fn test_list_request_flattens_options() {
    let req = ListRequest {
        prefix: "avatars/".into(),
        options: ListOptions::default(),
    };
    assert_eq!(
        serde_json::to_value(&req).unwrap(),
        json!({
            "prefix": "avatars/",
            "limit": 100,
            "offset": 0,
            "sortBy": {"column": "name", "order": "asc"}
        })
    );
}

#[test]
fn test_bucket_options_matching_ignores_mime_order() {
    let options = BucketOptions::new("media")
        .public(true)
        .file_size_limit(5 * 1024 * 1024)
        .allowed_mime_types(["image/png", "image/jpeg"]);

    let existing = Bucket {
        id: "media".into(),
        name: "media".into(),
        public: true,
        file_size_limit: Some(5 * 1024 * 1024),
        allowed_mime_types: Some(vec!["image/jpeg".into(), "image/png".into()]),
    };
    assert!(options.matches(&existing));

    let private = Bucket {
        public: false,
        ..existing
    };
    assert!(!options.matches(&private));
}
