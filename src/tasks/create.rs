use std::fs::{self, File};
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::file_ref::FileRef;
use crate::part_context::PartContext;

/// Ensures the destination directory exists and truncates (or creates) the
/// destination file, so every DownloadPartTask has somewhere to seek-write
/// into. Runs once per multipart file; never retries.
pub struct CreateLocalFileTask {
    pub context: Arc<PartContext>,
    pub filename: Arc<FileRef>,
}

impl CreateLocalFileTask {
    fn create(&self) -> io::Result<()> {
        let dest = self
            .filename
            .dest()
            .expect("CreateLocalFileTask only runs for non-stream destinations");
        if let Some(dir) = dest.parent()
            && !dir.as_os_str().is_empty()
        {
            match fs::create_dir_all(dir) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(error),
            }
        }
        File::create(dest)?;
        Ok(())
    }

    pub fn run(self) {
        match self.create() {
            Ok(()) => {
                debug!(dest = ?self.filename.dest(), "local file created");
                self.context.announce_file_created();
            }
            Err(error) => {
                debug!(dest = ?self.filename.dest(), %error, "failed to create local file");
                self.context.cancel();
            }
        }
    }
}
