use anyhow::Result;
use mo_progress::{CompletionSummary, FanoutReport, ProgressEngine};

pub mod add_note;
pub mod dashboard;
pub mod delete_note;
pub mod edit_note;
pub mod mark_sent;
pub mod progress;
pub mod set_status;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()>;
}

pub fn progress_line(summary: &CompletionSummary) -> String {
    format!(
        "{}% ({}/{} processes, {} in progress) - {}",
        summary.percentage,
        summary.processed_slots,
        summary.total_slots,
        summary.in_progress_slots,
        summary.band()
    )
}

pub fn print_fanout(label: &str, report: &FanoutReport) {
    println!("📣 {label}: {} notified", report.delivered.len());
    for (recipient, error) in &report.failed {
        println!("   ❌ {recipient}: {error}");
    }
}

pub fn show_how_to_use() -> Result<()> {
    println!("🏭 mo-progress - Manufacturing Order Progress");
    println!();
    println!("Commands:");
    println!("  📊 mo-progress progress <order>                         # Completion of one order");
    println!("  ✏️  mo-progress set-status <order> --actor <user> <part>:<slot>=<status>");
    println!("  📁 mo-progress mark-sent <order> --actor <user> <file> | --all");
    println!("  📝 mo-progress add-note <order> --actor <user> <text>");
    println!("  ✏️  mo-progress edit-note <order> --actor <user> <position> <text>");
    println!("  🗑️  mo-progress delete-note <order> --actor <user> <position>");
    println!("  📋 mo-progress dashboard                                # All orders");
    Ok(())
}
