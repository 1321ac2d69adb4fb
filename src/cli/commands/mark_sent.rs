use anyhow::Result;
use mo_progress::ProgressEngine;

use super::Command;

pub struct MarkSentCommand {
    pub order_id: String,
    pub actor_id: String,
    pub file: Option<String>,
}

impl MarkSentCommand {
    /// `file = None` marks every known file.
    pub fn new(order_id: String, actor_id: String, file: Option<String>) -> Self {
        Self {
            order_id,
            actor_id,
            file,
        }
    }
}

impl Command for MarkSentCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        let actor = engine.load_actor(&self.actor_id).await?;
        let mut session = engine.open_order(&self.order_id, actor).await?;

        match &self.file {
            Some(file) => {
                session.mark_file_sent(file).await?;
                println!("✅ {file} marked as sent on {}", session.order().name);
            }
            None => {
                let count = session.mark_all_files_sent().await?;
                println!("✅ {count} file(s) marked as sent on {}", session.order().name);
            }
        }
        Ok(())
    }
}
