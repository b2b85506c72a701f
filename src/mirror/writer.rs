use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes pretty-printed JSON documents into one directory.
///
/// Each document goes to a temp file beside its destination and is renamed
/// into place, so readers see either the old file or the complete new one.
pub struct AtomicJsonWriter {
    output_dir: PathBuf,
}

impl AtomicJsonWriter {
    /// Create a writer for `output_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        Ok(AtomicJsonWriter { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Serialize `value` to `file_name` and return the final path
    pub fn write<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let temp = NamedTempFile::new_in(&self.output_dir)
            .context("Failed to create temporary file")?;

        {
            let mut out = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut out, value)
                .with_context(|| format!("Failed to serialize {}", file_name))?;
            writeln!(out).context("Failed to write output")?;
            out.flush().context("Failed to flush output")?;
        }

        temp.persist(&path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AtomicJsonWriter::new(dir.path()).unwrap();

        writer.write("out.json", &json!({"v": 1})).unwrap();
        let path = writer.write("out.json", &json!({"v": 2})).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!({"v": 2}));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let writer = AtomicJsonWriter::new(&nested).unwrap();
        writer.write("x.json", &json!([])).unwrap();

        assert!(nested.join("x.json").exists());
    }
}
