use std::path::Path;

use anyhow::Result;
use simple_error::simple_error;

/// Creates `path` (and its parents) unless it already is a directory.
pub async fn assert_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            if meta.is_dir() {
                Ok(())
            } else {
                Err(simple_error!("`{}` exists but is not a directory", path.display()).into())
            }
        }
        Err(_) => Ok(tokio::fs::create_dir_all(path).await?),
    }
}

/// [`assert_dir`] for the directory a file is going to be written to.
pub async fn assert_parent_dir(file: impl AsRef<Path>) -> Result<()> {
    match file.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => assert_dir(parent).await,
        _ => Ok(()),
    }
}
