use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::metrics::ExportMetrics;

/// Writes pipeline artifacts into one output directory.
///
/// JSON artifacts are compact arrays of records, UTF-8 with non-ASCII
/// characters written literally.
pub struct ExportWriter {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl ExportWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        info!("Writing exports to {}", directory.display());
        Ok(Self {
            directory,
            written: Vec::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }

    fn create(&self, file_name: &str) -> Result<(PathBuf, BufWriter<fs::File>)> {
        let path = self.directory.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok((path, BufWriter::new(file)))
    }

    fn finish(&mut self, path: PathBuf) -> Result<()> {
        let bytes = fs::metadata(&path)?.len() as usize;
        ExportMetrics::record_file_written(bytes);
        debug!("Wrote {} ({} bytes)", path.display(), bytes);
        self.written.push(path);
        Ok(())
    }

    /// Serialize `value` as JSON into `file_name`
    pub fn write_json<T: Serialize + ?Sized>(&mut self, file_name: &str, value: &T) -> Result<PathBuf> {
        let (path, mut writer) = self.create(file_name)?;
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
        self.finish(path.clone())?;
        Ok(path)
    }

    /// One line per item
    pub fn write_lines<I, S>(&mut self, file_name: &str, lines: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (path, mut writer) = self.create(file_name)?;
        for line in lines {
            writeln!(writer, "{}", line.as_ref())?;
        }
        writer.flush()?;
        self.finish(path.clone())?;
        Ok(path)
    }
}

/// Fingerprint of one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDigest {
    pub role: String,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

impl InputDigest {
    pub fn of(role: &str, path: &Path) -> Result<Self> {
        let content = fs::read(path)
            .map_err(|e| PipelineError::load(path, format!("cannot read for digest: {e}")))?;
        Ok(Self {
            role: role.to_string(),
            path: path.to_path_buf(),
            sha256: sha256_hex(&content),
            bytes: content.len() as u64,
        })
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Identity of a run: the input fingerprints a cache can key on, plus
/// what was produced and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub inputs: Vec<InputDigest>,
    pub outputs: Vec<String>,
}

impl RunManifest {
    pub fn new(inputs: Vec<InputDigest>, outputs: &[PathBuf]) -> Self {
        Self {
            generated_at: Utc::now(),
            inputs,
            outputs: outputs
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        }
    }

    /// Combined key over every input digest, in input order
    pub fn cache_key(&self) -> String {
        let joined: Vec<&str> = self.inputs.iter().map(|i| i.sha256.as_str()).collect();
        sha256_hex(joined.join(":").as_bytes())
    }
}
