use atrium_cli::{OutputFormatter, Result};
use atrium_link::{AtriumClient, EventFilter, LiveTable, LiveTableOptions, RowFilter};

pub struct WatchRequest {
    pub table: String,
    pub event: EventFilter,
    pub filter: Option<RowFilter>,
    pub identity_key: String,
    pub schema: String,
    pub count: Option<usize>,
}

/// Seed, then print each applied change until Ctrl-C, the stream ends, or
/// `count` changes have been seen.
pub async fn handle_watch(
    client: &AtriumClient,
    formatter: &OutputFormatter,
    request: WatchRequest,
) -> Result<()> {
    let options = LiveTableOptions::default()
        .with_identity_key(request.identity_key.as_str())
        .with_schema(request.schema.as_str());
    let mut live = LiveTable::open(client, &request.table, request.event, request.filter, options).await?;

    if !formatter.is_json() {
        eprintln!(
            "Watching {}.{} ({} rows loaded). Press Ctrl-C to stop.",
            request.schema,
            request.table,
            live.rows().len()
        );
    }

    let mut seen = 0usize;
    let result = loop {
        if request.count.is_some_and(|max| seen >= max) {
            break Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            change = live.next_change() => match change {
                Some(Ok((event, applied))) => {
                    seen += 1;
                    println!(
                        "{}",
                        formatter.change(&event, applied, &request.identity_key, live.rows().len())
                    );
                },
                Some(Err(e)) => break Err(e.into()),
                None => {
                    log::info!("Change stream for {} ended", request.table);
                    break Ok(());
                },
            },
        }
    };

    live.close().await?;
    result
}
