use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use tracing::debug;

use crate::errors::EngineError;
use crate::file_ref::FileRef;
use crate::io::IoRequest;
use crate::part_context::PartContext;
use crate::printer::PrintTask;

use super::{apply_mtime, print_operation};

/// Waits for every part of a file to finish, fixes up its modification
/// time, reports success, and tells the Writer to close the destination.
pub struct CompleteDownloadTask {
    pub context: Arc<PartContext>,
    pub filename: Arc<FileRef>,
    pub print_tx: SyncSender<PrintTask>,
    pub write_tx: SyncSender<IoRequest>,
}

impl CompleteDownloadTask {
    pub fn run(self) {
        match self.context.wait_for_completion() {
            Ok(()) => {
                if let Some(dest) = self.filename.dest() {
                    if let Some(last_update) = self.filename.last_update
                        && let Err(error) = apply_mtime(dest, last_update)
                    {
                        debug!(?dest, %error, "failed to set modification time");
                    }
                }
                let message = print_operation(&self.filename, false, None);
                let _ = self.print_tx.send(PrintTask::success(message));
                let _ = self.write_tx.send(IoRequest::Close {
                    dest: self.filename.io_key(),
                });
            }
            Err(EngineError::Cancelled) => {
                debug!(dest = ?self.filename.dest(), "completion observed cancellation");
            }
            Err(_) => unreachable!("wait_for_completion only ever returns Cancelled"),
        }
    }
}
