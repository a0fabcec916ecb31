//! The closed set of executable task kinds the priority queue carries.

mod basic;
mod complete;
mod create;
mod download_part;

pub use basic::BasicTask;
pub use complete::CompleteDownloadTask;
pub use create::CreateLocalFileTask;
pub use download_part::DownloadPartTask;

use std::fs::File;
use std::path::Path;

use crate::file_ref::FileRef;

/// A unit of work pulled off the [`crate::queue::StablePriorityQueue`].
///
/// A closed tagged enum rather than a trait object: the engine only ever
/// needs these four kinds plus the shutdown sentinel, and matching on a
/// concrete enum keeps the worker loop free of dynamic dispatch.
pub enum Task {
    Basic(BasicTask),
    CreateLocalFile(CreateLocalFileTask),
    DownloadPart(DownloadPartTask),
    Complete(CompleteDownloadTask),
    /// Terminates the worker thread that pulls it off the queue.
    Shutdown,
}

impl Task {
    pub fn run(self) {
        match self {
            Task::Basic(task) => task.run(),
            Task::CreateLocalFile(task) => task.run(),
            Task::DownloadPart(task) => task.run(),
            Task::Complete(task) => task.run(),
            Task::Shutdown => {}
        }
    }
}

/// Formats the one-line progress/result message shared by every task kind:
/// `"download: <src> to <dest>"`, with a `failed <reason>` suffix on error.
fn print_operation(filename: &FileRef, failed: bool, error_message: Option<&str>) -> String {
    let mut out = filename.operation_name.to_string();
    if failed {
        out.push_str(" failed");
    }
    out.push_str(": ");
    out.push_str(filename.src.as_str());
    if !filename.is_stream
        && let Some(dest) = filename.dest()
    {
        out.push_str(" to ");
        out.push_str(&relative_path(dest));
    }
    if let Some(message) = error_message {
        out.push(' ');
        out.push_str(message);
    }
    out
}

/// Best-effort relative path for display; falls back to the absolute path
/// when no relative form exists (e.g. a different drive on Windows).
fn relative_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff(path, &cwd))
        .unwrap_or_else(|| path.display().to_string())
}

fn pathdiff(path: &Path, base: &Path) -> Option<String> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    path.strip_prefix(&base)
        .ok()
        .map(|rel| rel.display().to_string())
}

/// Sets `dest`'s modification time to the server's `Last-Modified`, shared by
/// every task kind that finishes a non-stream destination.
fn apply_mtime(dest: &Path, last_update: chrono::DateTime<chrono::Utc>) -> std::io::Result<()> {
    let file = File::options().write(true).open(dest)?;
    let time = std::time::SystemTime::UNIX_EPOCH
        + std::time::Duration::from_secs(last_update.timestamp().max(0) as u64);
    file.set_modified(time)
}
