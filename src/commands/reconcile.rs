use crate::output::UserOutput;
use container_warden::{Config, Reconciler};

pub async fn run_reconcile(config: &Config, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let (store, runtime) = super::open_backends(config).await?;
    let reconciler = Reconciler::new(
        store,
        runtime,
        config.orphan_policy,
        config.container_name_prefix.clone(),
    );
    let (view, report) = reconciler.reconcile().await?;

    if json {
        out.status(&serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    out.status("Reconciliation:");
    out.status(&format!("{:-<50}", ""));
    out.status(&format!("  Active containers:  {}", view.len()));
    out.status(&format!("  Kept:               {}", report.kept.len()));
    out.status(&format!("  Dropped (vanished): {}", report.dropped.len()));
    for user in &report.dropped {
        out.status(&format!("    - {}", user));
    }
    if !report.unverified.is_empty() {
        out.warning(&format!(
            "  Unverified (runtime unreachable): {}",
            report.unverified.join(", ")
        ));
    }
    if !report.orphans.is_empty() {
        out.blank();
        out.warning(&format!(
            "Orphaned containers: {} ({} removed)",
            report.orphans.len(),
            report.orphans_removed
        ));
        for orphan in &report.orphans {
            out.warning(&format!("    - {}", orphan));
        }
    }

    Ok(())
}
