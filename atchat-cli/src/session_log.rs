use std::io::Write;
use std::path::{Path, PathBuf};

use atchat::{Message, Role};

/// Append-only JSONL record of one run: a `session_start` line followed by
/// one `message` line per transcript entry.
pub struct SessionLogger {
    file: std::io::BufWriter<std::fs::File>,
    path: PathBuf,
    pub session_id: String,
}

impl SessionLogger {
    pub fn new(dir: &Path, root: Option<&Path>, relay_url: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let now = chrono::Local::now();
        let path = dir.join(format!("{}.jsonl", now.format("%Y%m%d_%H%M%S")));
        let file = std::io::BufWriter::new(std::fs::File::create(&path)?);
        let session_id = uuid::Uuid::new_v4().to_string();

        let mut logger = Self {
            file,
            path,
            session_id: session_id.clone(),
        };
        logger.write_json(&serde_json::json!({
            "type": "session_start",
            "session_id": session_id,
            "ts": now.to_rfc3339(),
            "root": root.map(|p| p.to_string_lossy().to_string()),
            "relay_url": relay_url,
        }))?;

        Ok(logger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_json(&mut self, value: &serde_json::Value) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.file, value)?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        Ok(())
    }

    pub fn log_message(&mut self, message: &Message) {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        if let Err(e) = self.write_json(&serde_json::json!({
            "type": "message",
            "ts": chrono::Local::now().to_rfc3339(),
            "role": role,
            "content": message.content,
        })) {
            tracing::warn!("session log write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn records(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn starts_with_session_record() {
        let dir = TempDir::new().unwrap();
        let logger =
            SessionLogger::new(&dir.path().join("sessions"), Some(Path::new("/w")), "http://r").unwrap();
        let lines = records(logger.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "session_start");
        assert_eq!(lines[0]["session_id"], logger.session_id.as_str());
        assert_eq!(lines[0]["root"], "/w");
        assert_eq!(lines[0]["relay_url"], "http://r");
    }

    #[test]
    fn one_line_per_message() {
        let dir = TempDir::new().unwrap();
        let mut logger = SessionLogger::new(dir.path(), None, "http://r").unwrap();
        logger.log_message(&Message::user("read @a.txt"));
        logger.log_message(&Message::assistant("done"));
        let lines = records(logger.path());
        assert_eq!(lines.len(), 3);
        assert!(lines[0]["root"].is_null());
        assert_eq!(lines[1]["role"], "user");
        assert_eq!(lines[1]["content"], "read @a.txt");
        assert_eq!(lines[2]["role"], "assistant");
        assert_eq!(lines[2]["type"], "message");
    }
}
