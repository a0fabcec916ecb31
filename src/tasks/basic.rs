use std::fs::{self, File};
use std::io::{self, Read, Write as _};
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::LAST_MODIFIED;
use tracing::debug;

use crate::config::{BASIC_TASK_ATTEMPTS, ITERATE_CHUNK_SIZE};
use crate::errors::EngineError;
use crate::file_ref::FileRef;
use crate::integrity::{Checksum, RunningMd5, checksum_from_headers};
use crate::io::IoRequest;
use crate::printer::PrintTask;

use super::{apply_mtime, print_operation};

/// Downloads a file small enough to skip the multipart path in a single
/// request, with its own short retry loop. Runs with no PartContext and
/// touches the destination directly — nothing else contends for it.
pub struct BasicTask {
    pub client: Client,
    pub filename: FileRef,
    pub print_tx: SyncSender<PrintTask>,
    pub write_tx: SyncSender<IoRequest>,
}

impl BasicTask {
    fn download(&self) -> Result<(), EngineError> {
        let response = self.client.get(self.filename.src.clone()).send()?;
        let response = response.error_for_status()?;
        let checksum = checksum_from_headers(response.headers());
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|v| v.with_timezone(&Utc));

        if self.filename.is_stream {
            self.download_stream(response, checksum)
        } else {
            self.download_file(response, checksum, last_modified)
        }
    }

    fn download_file(
        &self,
        mut response: reqwest::blocking::Response,
        checksum: Checksum,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let dest = self
            .filename
            .dest()
            .expect("non-stream BasicTask has a destination");
        if let Some(dir) = dest.parent()
            && !dir.as_os_str().is_empty()
        {
            match fs::create_dir_all(dir) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(error.into()),
            }
        }

        let mut file = File::create(dest)?;
        let mut md5 = RunningMd5::new();
        let mut buf = vec![0u8; ITERATE_CHUNK_SIZE];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            if matches!(checksum, Checksum::Verify(_)) {
                md5.update(&buf[..n]);
            }
            file.write_all(&buf[..n])?;
        }
        drop(file);

        if let Checksum::Verify(expected) = checksum
            && md5.hexdigest() != expected
        {
            let _ = fs::remove_file(dest);
            return Err(EngineError::Md5Mismatch(dest.display().to_string()));
        }

        if let Some(last_update) = last_modified
            && let Err(error) = apply_mtime(dest, last_update)
        {
            debug!(?dest, %error, "failed to set modification time");
        }
        Ok(())
    }

    fn download_stream(
        &self,
        mut response: reqwest::blocking::Response,
        checksum: Checksum,
    ) -> Result<(), EngineError> {
        let mut body = Vec::new();
        response.read_to_end(&mut body)?;

        if let Checksum::Verify(expected) = &checksum {
            let mut md5 = RunningMd5::new();
            md5.update(&body);
            if &md5.hexdigest() != expected {
                return Err(EngineError::Md5Mismatch(self.filename.src.to_string()));
            }
        }

        let dest = self.filename.io_key();
        let _ = self.write_tx.send(IoRequest::Write {
            dest: dest.clone(),
            offset: 0,
            data: body,
            is_stream: true,
        });
        let _ = self.write_tx.send(IoRequest::Close { dest });
        Ok(())
    }

    pub fn run(self) {
        let mut last_error = None;
        for attempt in 1..=BASIC_TASK_ATTEMPTS {
            match self.download() {
                Ok(()) => {
                    let message = print_operation(&self.filename, false, None);
                    let _ = self.print_tx.send(PrintTask::success(message));
                    return;
                }
                Err(error) if error.is_retryable() => {
                    debug!(attempt, %error, "retrying basic task");
                    std::thread::sleep(Duration::from_millis(250 * attempt as u64));
                    last_error = Some(error);
                }
                Err(error) => {
                    let message = print_operation(&self.filename, true, Some(&error.to_string()));
                    let _ = self.print_tx.send(PrintTask::failure(message));
                    return;
                }
            }
        }
        let message = print_operation(
            &self.filename,
            true,
            last_error.as_ref().map(|e| e.to_string()).as_deref(),
        );
        let _ = self.print_tx.send(PrintTask::failure(message));
    }
}
