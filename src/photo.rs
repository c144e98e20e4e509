use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use directories::BaseDirs;
use image::DynamicImage;
use sha1::{Digest, Sha1};

use crate::config::APP_NAME;
use crate::fetch::{http_client, LoadEvent};

const CACHE_SUBDIR: &str = "img";

pub fn cache_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let dir = match configured {
        Some(dir) => dir.to_path_buf(),
        None => {
            let base = BaseDirs::new().context("unable to determine cache directory")?;
            base.cache_dir().join(APP_NAME).join(CACHE_SUBDIR)
        }
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create photo cache at {}", dir.display()))?;
    Ok(dir)
}

pub fn cache_key(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn cached_image_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(format!("{}.img", cache_key(url)))
}

pub fn load_cached_image(dir: &Path, url: &str) -> Result<Option<Vec<u8>>> {
    let path = cached_image_path(dir, url);
    if path.exists() {
        let data = fs::read(&path)?;
        Ok(Some(data))
    } else {
        Ok(None)
    }
}

pub fn save_cached_image(dir: &Path, url: &str, data: &[u8]) -> Result<PathBuf> {
    let path = cached_image_path(dir, url);
    fs::write(&path, data)?;
    Ok(path)
}

fn download(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .with_context(|| format!("failed to download {url}"))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("failed to read body of {url}"))?;
    Ok(bytes.to_vec())
}

/// Cached bytes when present, otherwise download and remember them.
pub fn fetch_portrait(
    client: &reqwest::blocking::Client,
    dir: &Path,
    url: &str,
) -> Result<DynamicImage> {
    let data = match load_cached_image(dir, url)? {
        Some(data) => data,
        None => {
            let data = download(client, url)?;
            if let Err(err) = save_cached_image(dir, url, &data) {
                tracing::warn!(error = %err, url, "unable to cache portrait");
            }
            data
        }
    };
    image::load_from_memory(&data).with_context(|| format!("unable to decode portrait {url}"))
}

/// Background downloader for card and modal portraits.
///
/// Requests are served one at a time in the order they were queued; each
/// produces one `LoadEvent::Photo`.
pub struct PhotoWorker {
    requests: Sender<String>,
}

impl PhotoWorker {
    pub fn spawn(dir: PathBuf, events: Sender<LoadEvent>) -> Result<Self> {
        let (requests, queue) = mpsc::channel::<String>();
        let client = http_client().context("failed to build HTTP client for portraits")?;
        thread::Builder::new()
            .name(format!("{APP_NAME}-photos"))
            .spawn(move || {
                for url in queue {
                    let result = fetch_portrait(&client, &dir, &url);
                    if let Err(err) = &result {
                        tracing::warn!(error = %err, url = %url, "portrait unavailable");
                    }
                    if events.send(LoadEvent::Photo { url, result }).is_err() {
                        break;
                    }
                }
            })
            .context("failed to start portrait worker")?;
        Ok(Self { requests })
    }

    pub fn request(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        if self.requests.send(url.to_string()).is_err() {
            tracing::warn!(url, "portrait worker has stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_hex() {
        let key = cache_key("https://randomuser.me/api/portraits/women/1.jpg");
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("https://randomuser.me/api/portraits/women/1.jpg"));
        assert_ne!(key, cache_key("https://randomuser.me/api/portraits/women/2.jpg"));
    }

    #[test]
    fn cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://example.com/a.jpg";
        assert!(load_cached_image(dir.path(), url).unwrap().is_none());
        save_cached_image(dir.path(), url, b"bytes").unwrap();
        assert_eq!(
            load_cached_image(dir.path(), url).unwrap().as_deref(),
            Some(&b"bytes"[..])
        );
    }

    #[test]
    fn cached_garbage_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://example.com/broken.jpg";
        save_cached_image(dir.path(), url, b"not an image").unwrap();
        let client = http_client().unwrap();
        assert!(fetch_portrait(&client, dir.path(), url).is_err());
    }

    #[test]
    fn configured_cache_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        assert_eq!(cache_dir(Some(&nested)).unwrap(), nested);
        assert!(nested.is_dir());
    }
}
