use crate::output::UserOutput;
use container_warden::{Config, SqliteStateStore, StateStore};

/// Print what the store holds. Does not contact the runtime.
pub async fn run_list(config: &Config, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let store = SqliteStateStore::open(&config.database_path).await?;
    store.initialize().await?;

    let records = store.list_all().await?;
    let blacklist = store.list_blacklist().await?;

    if json {
        let value = serde_json::json!({
            "containers": records,
            "blacklist": blacklist,
        });
        out.status(&serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    out.status("Containers:");
    out.status(&format!("{:-<70}", ""));
    if records.is_empty() {
        out.status("  No containers recorded");
    }
    for record in &records {
        out.status(&format!(
            "  {:<20} {:<12} {:<30} {}",
            record.user_id,
            container_warden::runtime::short_id(&record.container_id),
            record.container_name,
            record.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    out.blank();
    out.status("Blacklist:");
    out.status(&format!("{:-<70}", ""));
    if blacklist.is_empty() {
        out.status("  Nobody is blacklisted");
    }
    for entry in &blacklist {
        let reason = if entry.reason.is_empty() {
            "-"
        } else {
            entry.reason.as_str()
        };
        out.status(&format!(
            "  {:<20} {:<20} {}",
            entry.user_id,
            entry.blacklisted_at.format("%Y-%m-%d %H:%M:%S"),
            reason
        ));
    }

    Ok(())
}
