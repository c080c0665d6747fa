use atrium_cli::{CLIError, CheckOutcome, OutputFormatter, Result};
use atrium_link::{AtriumClient, AtriumLinkError, ListOptions};
use std::future::Future;
use std::time::Instant;

async fn timed<F, T>(name: &str, check: F) -> CheckOutcome
where
    F: Future<Output = atrium_link::Result<T>>,
    T: Into<String>,
{
    let start = Instant::now();
    let result = check.await;
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(detail) => CheckOutcome {
            name: name.to_string(),
            ok: true,
            detail: detail.into(),
            duration_ms,
        },
        Err(e) => {
            log::debug!("Check {} failed: {:?}", name, e);
            CheckOutcome {
                name: name.to_string(),
                ok: false,
                detail: CLIError::from(e).to_string(),
                duration_ms,
            }
        },
    }
}

/// Auth health, a one-row table read and a bucket listing.
pub async fn run_checks(client: &AtriumClient, table: &str, bucket: &str) -> Vec<CheckOutcome> {
    let auth = timed("auth", async {
        let health = client.health_check().await?;
        Ok::<_, AtriumLinkError>(format!("{} {}", health.name, health.version).trim().to_string())
    })
    .await;

    let tables = timed("tables", async {
        let rows = client.from(table).select("*").limit(1).execute().await?;
        Ok::<_, AtriumLinkError>(format!("{} readable ({} row(s) sampled)", table, rows.len()))
    })
    .await;

    let storage = timed("storage", async {
        let objects = client
            .bucket(bucket)
            .list("", ListOptions::default())
            .await?;
        Ok::<_, AtriumLinkError>(format!("{} listed ({} object(s))", bucket, objects.len()))
    })
    .await;

    vec![auth, tables, storage]
}

pub async fn handle_check(
    client: &AtriumClient,
    formatter: &OutputFormatter,
    table: &str,
    bucket: &str,
) -> Result<()> {
    let outcomes = run_checks(client, table, bucket).await;
    for outcome in &outcomes {
        println!("{}", formatter.check(outcome));
    }
    if let Some(summary) = formatter.check_summary(&outcomes) {
        println!("{}", summary);
    }

    let failed = outcomes.iter().filter(|o| !o.ok).count();
    if failed > 0 {
        return Err(CLIError::CheckFailed {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}
