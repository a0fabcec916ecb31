//! [`FileRef`]: the immutable-after-init descriptor of one transfer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reqwest::blocking::Response;
use reqwest::header::{CONTENT_LENGTH, LAST_MODIFIED};
use url::Url;

/// One file to be fetched, and where it goes.
///
/// `is_stream ⇒ dest = None` is maintained by construction: [`FileRef::new`]
/// and [`FileRef::new_stream`] are the only constructors.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub src: Url,
    dest: Option<PathBuf>,
    pub size: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
    pub is_stream: bool,
    pub operation_name: &'static str,
}

impl FileRef {
    pub fn new(src: Url, dest: PathBuf) -> Self {
        FileRef {
            src,
            dest: Some(dest),
            size: None,
            last_update: None,
            is_stream: false,
            operation_name: "download",
        }
    }

    pub fn new_stream(src: Url) -> Self {
        FileRef {
            src,
            dest: None,
            size: None,
            last_update: None,
            is_stream: true,
            operation_name: "download",
        }
    }

    /// Destination path. Only ever `None` for stream transfers.
    pub fn dest(&self) -> Option<&PathBuf> {
        self.dest.as_ref()
    }

    /// The key the Writer's handle map uses for this file: the real
    /// destination path, or a fixed sentinel for stream transfers (every
    /// stream write ultimately goes to the same standard-output handle).
    pub fn io_key(&self) -> PathBuf {
        self.dest.clone().unwrap_or_else(|| PathBuf::from("-"))
    }

    /// Populates `size` and `last_update` from a response's headers. Called
    /// once, before any part task begins; `FileRef` is read-only thereafter.
    pub fn ingest_headers(&mut self, response: &Response) {
        if self.size.is_none()
            && let Some(len) = response.headers().get(CONTENT_LENGTH)
            && let Ok(len) = len.to_str()
            && let Ok(len) = len.parse::<u64>()
        {
            self.size = Some(len);
        }
        if self.last_update.is_none()
            && let Some(lm) = response.headers().get(LAST_MODIFIED)
            && let Ok(lm) = lm.to_str()
            && let Ok(parsed) = DateTime::parse_from_rfc2822(lm)
        {
            self.last_update = Some(parsed.with_timezone(&Utc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_has_no_dest() {
        let f = FileRef::new_stream(Url::parse("https://example.com/x").unwrap());
        assert!(f.is_stream);
        assert!(f.dest().is_none());
    }

    #[test]
    fn file_has_dest() {
        let f = FileRef::new(
            Url::parse("https://example.com/x").unwrap(),
            PathBuf::from("/tmp/x"),
        );
        assert!(!f.is_stream);
        assert_eq!(f.dest(), Some(&PathBuf::from("/tmp/x")));
    }
}
