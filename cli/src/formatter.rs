//! Terminal and JSON rendering of command results.
//!
//! Every method returns the line(s) to print so callers decide where they
//! go and tests can inspect them.

use atrium_link::{Applied, BucketProvision, ChangeEvent};
use atrium_session::{GuardedRoute, Permission, Role};
use colored::Colorize;
use serde_json::{json, Value as JsonValue};

/// Result of one connectivity check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub name: String,
    pub ok: bool,
    pub detail: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn check(&self, outcome: &CheckOutcome) -> String {
        if self.json {
            return json!({
                "check": outcome.name,
                "ok": outcome.ok,
                "detail": outcome.detail,
                "duration_ms": outcome.duration_ms,
            })
            .to_string();
        }
        let mark = if outcome.ok {
            "ok  ".green().bold()
        } else {
            "FAIL".red().bold()
        };
        format!(
            "{} {:<8} {} {}",
            mark,
            outcome.name,
            outcome.detail,
            format!("({} ms)", outcome.duration_ms).dimmed()
        )
    }

    pub fn check_summary(&self, outcomes: &[CheckOutcome]) -> Option<String> {
        if self.json {
            return None;
        }
        let failed = outcomes.iter().filter(|o| !o.ok).count();
        Some(if failed == 0 {
            format!("All {} checks passed", outcomes.len()).green().to_string()
        } else {
            format!("{} of {} checks failed", failed, outcomes.len()).red().to_string()
        })
    }

    pub fn change(&self, event: &ChangeEvent, applied: Applied, identity_key: &str, total_rows: usize) -> String {
        let identity = event
            .identity(identity_key)
            .map(JsonValue::to_string)
            .unwrap_or_else(|| "?".to_string());
        let kind = format!("{:?}", event.kind()).to_uppercase();
        let (applied_name, index) = match applied {
            Applied::Inserted(i) => ("inserted", Some(i)),
            Applied::Updated(i) => ("updated", Some(i)),
            Applied::Deleted(i) => ("deleted", Some(i)),
            Applied::Ignored => ("ignored", None),
        };

        if self.json {
            let row = match event {
                ChangeEvent::Insert { row, .. } | ChangeEvent::Update { row, .. } => {
                    JsonValue::Object(row.clone())
                },
                ChangeEvent::Delete { old_row, .. } => JsonValue::Object(old_row.clone()),
            };
            return json!({
                "kind": kind,
                "schema": event.schema(),
                "table": event.table(),
                identity_key: event.identity(identity_key),
                "applied": applied_name,
                "index": index,
                "rows": total_rows,
                "row": row,
            })
            .to_string();
        }

        let kind = match applied {
            Applied::Inserted(_) => kind.green(),
            Applied::Updated(_) => kind.yellow(),
            Applied::Deleted(_) => kind.red(),
            Applied::Ignored => kind.dimmed(),
        };
        format!(
            "{:<6} {}.{} {}={} {} ({} rows)",
            kind,
            event.schema(),
            event.table(),
            identity_key,
            identity,
            applied_name,
            total_rows
        )
    }

    pub fn provision(&self, outcome: &BucketProvision) -> String {
        let bucket = outcome.bucket();
        let action = match outcome {
            BucketProvision::Created(_) => "created",
            BucketProvision::Unchanged(_) => "unchanged",
            BucketProvision::Updated(_) => "updated",
        };
        if self.json {
            return json!({
                "bucket": bucket.id,
                "action": action,
                "public": bucket.public,
                "file_size_limit": bucket.file_size_limit,
                "allowed_mime_types": bucket.allowed_mime_types,
            })
            .to_string();
        }
        let limit = bucket
            .file_size_limit
            .map(|b| format!("{} bytes", b))
            .unwrap_or_else(|| "unlimited".to_string());
        let types = bucket
            .allowed_mime_types
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| t.join(", "))
            .unwrap_or_else(|| "any".to_string());
        format!(
            "Bucket {} {} (public: {}, limit: {}, types: {})",
            bucket.id.bold(),
            action.cyan(),
            bucket.public,
            limit,
            types
        )
    }

    pub fn whoami(
        &self,
        email: &str,
        role: Option<Role>,
        permissions: &[Permission],
        routes: &[&GuardedRoute],
    ) -> String {
        if self.json {
            return json!({
                "email": email,
                "role": role.map(|r| r.as_str()),
                "permissions": permissions.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
                "routes": routes.iter().map(|r| r.prefix.as_str()).collect::<Vec<_>>(),
            })
            .to_string();
        }
        let role = match role {
            Some(role) => role.as_str().green().bold(),
            None => "none".red().bold(),
        };
        let mut out = format!("{} ({})", email, role);
        let permissions: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
        out.push_str(&format!(
            "\n  permissions: {}",
            if permissions.is_empty() { "-".to_string() } else { permissions.join(", ") }
        ));
        let routes: Vec<&str> = routes.iter().map(|r| r.prefix.as_str()).collect();
        out.push_str(&format!(
            "\n  routes:      {}",
            if routes.is_empty() { "-".to_string() } else { routes.join(", ") }
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_link::{Bucket, Row};
    use atrium_session::RouteTable;

    fn row(id: i64) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("body".into(), json!("hi"));
        row
    }

    fn insert(id: i64) -> ChangeEvent {
        ChangeEvent::Insert {
            schema: "public".into(),
            table: "messages".into(),
            row: row(id),
            commit_timestamp: None,
        }
    }

    #[test]
    fn test_check_json_line() {
        let line = OutputFormatter::new(true).check(&CheckOutcome {
            name: "auth".into(),
            ok: false,
            detail: "connection refused".into(),
            duration_ms: 3,
        });
        let value: JsonValue = serde_json::from_str(&line).unwrap();
        assert_eq!(value["check"], "auth");
        assert_eq!(value["ok"], false);
    }

    #[test]
    fn test_check_summary_counts_failures() {
        let outcomes = vec![
            CheckOutcome { name: "auth".into(), ok: true, detail: String::new(), duration_ms: 1 },
            CheckOutcome { name: "storage".into(), ok: false, detail: String::new(), duration_ms: 1 },
        ];
        let summary = OutputFormatter::new(false).check_summary(&outcomes).unwrap();
        assert!(summary.contains("1 of 2 checks failed"));
        assert!(OutputFormatter::new(true).check_summary(&outcomes).is_none());
    }

    #[test]
    fn test_change_line() {
        let line = OutputFormatter::new(false).change(&insert(7), Applied::Inserted(2), "id", 3);
        assert!(line.contains("public.messages id=7 inserted (3 rows)"));

        let json_line = OutputFormatter::new(true).change(&insert(7), Applied::Inserted(2), "id", 3);
        let value: JsonValue = serde_json::from_str(&json_line).unwrap();
        assert_eq!(value["kind"], "INSERT");
        assert_eq!(value["id"], 7);
        assert_eq!(value["index"], 2);
        assert_eq!(value["row"]["body"], "hi");
    }

    #[test]
    fn test_ignored_change_has_no_index() {
        let json_line = OutputFormatter::new(true).change(&insert(1), Applied::Ignored, "id", 0);
        let value: JsonValue = serde_json::from_str(&json_line).unwrap();
        assert_eq!(value["applied"], "ignored");
        assert!(value["index"].is_null());
    }

    #[test]
    fn test_provision_line() {
        let outcome = BucketProvision::Created(Bucket {
            id: "media".into(),
            name: "media".into(),
            public: true,
            file_size_limit: Some(1024),
            allowed_mime_types: Some(vec!["image/png".into()]),
        });
        let line = OutputFormatter::new(false).provision(&outcome);
        assert!(line.contains("media"));
        assert!(line.contains("1024 bytes"));
        assert!(line.contains("image/png"));
    }

    #[test]
    fn test_whoami_without_role() {
        let table = RouteTable::site().unwrap();
        let routes = table.accessible(None);
        let line = OutputFormatter::new(true).whoami("ada@example.com", None, &[], &routes);
        let value: JsonValue = serde_json::from_str(&line).unwrap();
        assert!(value["role"].is_null());
        assert_eq!(value["routes"], json!([]));
    }
}
