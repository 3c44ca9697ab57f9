use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use proctor_core::proctoring::domain::violation::Violation;
use serde::Serialize;

#[derive(Serialize)]
struct Entry<'a> {
    session_id: &'a str,
    assessment_id: &'a str,
    #[serde(flatten)]
    violation: &'a Violation,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a str>,
}

/// Append-only JSON-lines record of audited violations.
///
/// One line per recorded violation, keyed by session and assessment ids.
pub struct ViolationLog<W: Write> {
    out: W,
    session_id: String,
    assessment_id: String,
    written: usize,
}

impl ViolationLog<BufWriter<File>> {
    pub fn create(path: &Path, session_id: &str, assessment_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file), session_id, assessment_id))
    }
}

impl<W: Write> ViolationLog<W> {
    pub fn new(out: W, session_id: &str, assessment_id: &str) -> Self {
        Self {
            out,
            session_id: session_id.to_string(),
            assessment_id: assessment_id.to_string(),
            written: 0,
        }
    }

    pub fn record(
        &mut self,
        violation: &Violation,
        snapshot: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let entry = Entry {
            session_id: &self.session_id,
            assessment_id: &self.assessment_id,
            violation,
            snapshot,
        };
        serde_json::to_writer(&mut self.out, &entry)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::proctoring::domain::violation::{Severity, ViolationType};

    fn violation() -> Violation {
        Violation::new(
            ViolationType::MultipleFaces,
            "Multiple faces detected (2)",
            Severity::High,
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_record_writes_one_json_line() {
        let mut log = ViolationLog::new(Vec::new(), "s-1", "exam-9");

        log.record(&violation(), None).unwrap();
        log.record(&violation(), Some("data:image/jpeg;base64,AAAA")).unwrap();

        assert_eq!(log.written(), 2);
        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["session_id"], "s-1");
        assert_eq!(first["assessment_id"], "exam-9");
        assert_eq!(first["type"], "MULTIPLE_FACES");
        assert_eq!(first["severity"], "high");
        assert!(first.get("snapshot").is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["snapshot"], "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_create_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("violations.jsonl");

        {
            let mut log = ViolationLog::create(&path, "a", "x").unwrap();
            log.record(&violation(), None).unwrap();
        }
        {
            let mut log = ViolationLog::create(&path, "b", "x").unwrap();
            log.record(&violation(), None).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().contains("\"session_id\":\"b\""));
    }
}
