//! Load stage: persist the cleaned frame as a columnar snapshot

use crate::errors::Result;
use crate::frame::Frame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `frame` to `processed_dir/file_name`, creating the directory
pub fn load(frame: &Frame, processed_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(processed_dir)?;
    let path = processed_dir.join(file_name);
    frame.save_snapshot(&path)?;
    info!("Data stored at: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_directory() {
        let dir = tempdir().unwrap();
        let frame = Frame::new(vec![Column::numeric("age", vec![Some(41.0)])]).unwrap();

        let path = load(&frame, &dir.path().join("processed"), "hr_cleaned.json").unwrap();
        assert_eq!(Frame::load_snapshot(path).unwrap(), frame);
    }
}
