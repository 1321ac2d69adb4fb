use anyhow::Result;
use mo_progress::ProgressEngine;

use super::Command;

pub struct DashboardCommand {
    pub json: bool,
}

impl DashboardCommand {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl Command for DashboardCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        let portfolio = engine.portfolio().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&portfolio)?);
            return Ok(());
        }

        let totals = &portfolio.totals;
        println!("📋 {} order(s)", totals.total);
        println!(
            "   ⏳ {} not started | 🔧 {} active | ✅ {} completed",
            totals.not_started, totals.active, totals.completed
        );
        println!();
        for order in &portfolio.orders {
            println!(
                "  {:<20} {:>3}%  {}",
                order.name,
                order.summary.percentage,
                order.summary.status()
            );
        }
        Ok(())
    }
}
