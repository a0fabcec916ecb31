use std::io::Read;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use tracing::debug;

use crate::config::{ITERATE_CHUNK_SIZE, PART_TASK_ATTEMPTS};
use crate::errors::EngineError;
use crate::file_ref::FileRef;
use crate::io::IoRequest;
use crate::part_context::PartContext;
use crate::printer::PrintTask;

use super::print_operation;

/// Downloads one byte-range part of a multipart file and queues its bytes
/// onto the write channel, without waiting for them to be flushed.
pub struct DownloadPartTask {
    pub part_number: u64,
    pub chunk_size: u64,
    pub num_parts: u64,
    pub client: Client,
    pub filename: Arc<FileRef>,
    pub context: Arc<PartContext>,
    pub write_tx: SyncSender<IoRequest>,
    pub print_tx: SyncSender<PrintTask>,
}

impl DownloadPartTask {
    fn range_header(&self) -> String {
        let start = self.part_number * self.chunk_size;
        if self.part_number + 1 == self.num_parts {
            format!("bytes={start}-")
        } else {
            let end = start + self.chunk_size - 1;
            format!("bytes={start}-{end}")
        }
    }

    fn attempt(&self) -> Result<(), EngineError> {
        let range = self.range_header();
        debug!(part = self.part_number, %range, "requesting byte range");
        let response = self
            .client
            .get(self.filename.src.clone())
            .header(RANGE, range)
            .send()?;
        let response = response.error_for_status()?;

        let expected_len = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        self.context.wait_for_file_created()?;

        if self.filename.is_stream {
            self.write_stream(response, expected_len)
        } else {
            self.write_file(response, expected_len)
        }
    }

    fn write_file(
        &self,
        mut response: reqwest::blocking::Response,
        expected_len: Option<u64>,
    ) -> Result<(), EngineError> {
        let dest = self
            .filename
            .dest()
            .expect("non-stream part task has a destination")
            .clone();
        let start = self.part_number * self.chunk_size;
        let mut buf = vec![0u8; ITERATE_CHUNK_SIZE];
        let mut amount_read: u64 = 0;

        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            amount_read += n as u64;
            let _ = self.write_tx.send(IoRequest::Write {
                dest: dest.clone(),
                offset: start + amount_read - n as u64,
                data: buf[..n].to_vec(),
                is_stream: false,
            });
        }

        verify_complete(amount_read, expected_len)
    }

    fn write_stream(
        &self,
        mut response: reqwest::blocking::Response,
        expected_len: Option<u64>,
    ) -> Result<(), EngineError> {
        self.context.wait_for_turn(self.part_number)?;
        let mut body = Vec::new();
        let amount_read = response.read_to_end(&mut body)? as u64;
        verify_complete(amount_read, expected_len)?;

        let _ = self.write_tx.send(IoRequest::Write {
            dest: self.filename.io_key(),
            offset: self.part_number * self.chunk_size,
            data: body,
            is_stream: true,
        });
        self.context.done_with_turn();
        Ok(())
    }

    pub fn run(self) {
        for attempt in 1..=PART_TASK_ATTEMPTS {
            match self.attempt() {
                Ok(()) => {
                    self.context.announce_completed_part(self.part_number);
                    let message = print_operation(&self.filename, false, None);
                    let _ = self.print_tx.send(
                        PrintTask::success(message).with_total_parts(self.num_parts),
                    );
                    return;
                }
                Err(error) if error.is_retryable() => {
                    debug!(part = self.part_number, attempt, %error, "retrying part download");
                    std::thread::sleep(Duration::from_millis(250 * attempt as u64));
                    continue;
                }
                Err(error) => {
                    self.context.cancel();
                    let message = print_operation(&self.filename, true, Some(&error.to_string()));
                    let _ = self.print_tx.send(PrintTask::failure(message));
                    return;
                }
            }
        }
        self.context.cancel();
        let error = EngineError::RetriesExceeded(PART_TASK_ATTEMPTS);
        let message = print_operation(&self.filename, true, Some(&error.to_string()));
        let _ = self.print_tx.send(PrintTask::failure(message));
    }
}

fn verify_complete(actual: u64, expected: Option<u64>) -> Result<(), EngineError> {
    match expected {
        Some(expected) if expected != actual => Err(EngineError::IncompleteRead { actual, expected }),
        _ => Ok(()),
    }
}
