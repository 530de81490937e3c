use std::path::{Path, PathBuf};

use anyhow::Context;
use reqwest::Url;
use tracing::{debug, info};

use crate::error::ClassifyError;

pub trait Fetch {
    /// Makes `url` available locally and returns the path of the local copy.
    fn fetch(&self, url: &str, prefix: &str) -> anyhow::Result<PathBuf>;
}

/// Downloads into a cache directory. A file that already exists is never
/// fetched again nor re-validated.
#[derive(Debug, Clone)]
pub struct Fetcher {
    cache_dir: PathBuf,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Fetcher {
    pub fn new<T: Into<PathBuf>>(cache_dir: T) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, url: &str, prefix: &str) -> Result<PathBuf, ClassifyError> {
        Ok(self.cache_dir.join(format!("{prefix}{}", file_name(url)?)))
    }
}

impl Fetch for Fetcher {
    fn fetch(&self, url: &str, prefix: &str) -> anyhow::Result<PathBuf> {
        let dest = self.cache_path(url, prefix)?;
        if dest.exists() {
            debug!("cache hit {} for {}", dest.display(), url);
            return Ok(dest);
        }
        download(url, &dest)?;
        Ok(dest)
    }
}

/// The last path segment of `url`, ignoring query and fragment.
pub fn file_name(url: &str) -> Result<String, ClassifyError> {
    let no_name = || ClassifyError::NoFileName {
        url: url.to_string(),
    };
    let parsed = Url::parse(url).map_err(|_| no_name())?;
    let name = parsed
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(no_name)?;
    Ok(name.to_string())
}

fn download(url: &str, dest: &Path) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let bytes = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .with_context(|| format!("download {url}"))?;

    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    if let Err(e) = std::fs::write(&part, &bytes).and_then(|_| std::fs::rename(&part, dest)) {
        let _ = std::fs::remove_file(&part);
        return Err(e).with_context(|| format!("write {}", dest.display()));
    }
    info!(
        "downloaded {} ({} bytes) to {} in {:?}",
        url,
        bytes.len(),
        dest.display(),
        start.elapsed()
    );
    Ok(())
}
