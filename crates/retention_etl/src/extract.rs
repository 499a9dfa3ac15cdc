//! Extract stage: make the raw dataset available as `hr_raw.csv`

use crate::errors::{EtlError, Result};
use crate::frame::Frame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Collaborator that drops one or more CSV files into a directory
pub trait DatasetSource {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Place the dataset files into `dest_dir`
    fn fetch(&self, dest_dir: &Path) -> Result<()>;
}

/// Dataset already available as a local CSV file
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for LocalFileSource {
    fn name(&self) -> &str {
        "local-file"
    }

    fn fetch(&self, dest_dir: &Path) -> Result<()> {
        let file_name = self.path.file_name().ok_or_else(|| EtlError::Source {
            source_name: self.name().to_string(),
            reason: format!("{} has no file name", self.path.display()),
        })?;
        fs::copy(&self.path, dest_dir.join(file_name)).map_err(|e| EtlError::Source {
            source_name: self.name().to_string(),
            reason: format!("cannot copy {}: {}", self.path.display(), e),
        })?;
        Ok(())
    }
}

/// Extract stage configuration
#[derive(Debug, Clone)]
pub struct Extractor {
    raw_dir: PathBuf,
    file_name: String,
}

impl Extractor {
    pub fn new<P: Into<PathBuf>>(raw_dir: P, file_name: &str) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            file_name: file_name.to_string(),
        }
    }

    /// Final location of the raw CSV
    pub fn destination(&self) -> PathBuf {
        self.raw_dir.join(&self.file_name)
    }

    /// Fetch the dataset unless already present, then read it
    #[instrument(skip(self, source), fields(source = source.name()))]
    pub fn extract(&self, source: &dyn DatasetSource) -> Result<Frame> {
        fs::create_dir_all(&self.raw_dir)?;
        let destination = self.destination();

        if destination.exists() {
            info!("{} already present, skipping fetch", destination.display());
        } else {
            info!("Fetching dataset into {}", self.raw_dir.display());
            source.fetch(&self.raw_dir)?;

            match self.find_downloaded_csv()? {
                Some(downloaded) => {
                    info!(
                        "Renaming {} -> {}",
                        downloaded.display(),
                        destination.display()
                    );
                    fs::rename(&downloaded, &destination)?;
                }
                None if destination.exists() => {}
                None => return Err(EtlError::MissingDataset(self.raw_dir.clone())),
            }
        }

        let frame = Frame::read_csv(&destination)?;
        info!(
            rows = frame.n_rows(),
            columns = frame.n_cols(),
            "raw dataset ready"
        );
        Ok(frame)
    }

    /// First `*.csv` in the raw dir other than the destination, by name
    fn find_downloaded_csv(&self) -> Result<Option<PathBuf>> {
        let mut candidates: Vec<PathBuf> = fs::read_dir(&self.raw_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some("csv")
                    && path.file_name().and_then(|n| n.to_str()) != Some(self.file_name.as_str())
            })
            .collect();
        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}
