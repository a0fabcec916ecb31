//! The Writer: the single thread that touches destination files or stdout.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use tracing::{debug, warn};

/// A positioned write, or a close marker for the Writer.
pub enum IoRequest {
    Write {
        dest: PathBuf,
        offset: u64,
        data: Vec<u8>,
        is_stream: bool,
    },
    Close { dest: PathBuf },
}

enum Sink {
    File(File),
    Sequential(Box<dyn Write + Send>),
}

/// Runs on its own thread until `rx` is disconnected; owns every file handle
/// it opens and is the only place that writes to a destination.
///
/// `stream_sink` names where `is_stream` writes land: `None` or `Some("-")`
/// means standard output, anything else is opened (created, truncated) the
/// first time a stream write arrives for it.
pub fn run(rx: Receiver<IoRequest>, stream_sink: Option<PathBuf>) {
    let mut handles: HashMap<PathBuf, Sink> = HashMap::new();

    for request in rx {
        match request {
            IoRequest::Write {
                dest,
                offset,
                data,
                is_stream,
            } => {
                if is_stream {
                    write_stream(&mut handles, &dest, &data, stream_sink.as_deref());
                } else if let Err(error) = write_file(&mut handles, &dest, offset, &data) {
                    warn!(?dest, %error, "write failed");
                }
            }
            IoRequest::Close { dest } => {
                if let Some(mut sink) = handles.remove(&dest) {
                    match &mut sink {
                        Sink::File(file) => {
                            let _ = file.flush();
                        }
                        Sink::Sequential(writer) => {
                            let _ = writer.flush();
                        }
                    }
                    debug!(?dest, "closed destination");
                }
            }
        }
    }
}

fn write_file(
    handles: &mut HashMap<PathBuf, Sink>,
    dest: &PathBuf,
    offset: u64,
    data: &[u8],
) -> io::Result<()> {
    if !handles.contains_key(dest) {
        let file = OpenOptions::new().write(true).open(dest)?;
        handles.insert(dest.clone(), Sink::File(file));
    }
    let Sink::File(file) = handles.get_mut(dest).unwrap() else {
        unreachable!("stream sink registered under a file path");
    };
    #[cfg(unix)]
    {
        file.write_all_at(data, offset)
    }
    #[cfg(not(unix))]
    {
        use std::io::{Seek, SeekFrom};
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)
    }
}

fn write_stream(
    handles: &mut HashMap<PathBuf, Sink>,
    dest: &PathBuf,
    data: &[u8],
    stream_sink: Option<&std::path::Path>,
) {
    if !handles.contains_key(dest) {
        let real_path = stream_sink.filter(|p| !p_is_stdout(p));
        let sink: Box<dyn Write + Send> = match real_path {
            None => Box::new(io::stdout()),
            Some(path) => match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
                Ok(file) => Box::new(file),
                Err(error) => {
                    warn!(?path, %error, "failed to open stream sink, falling back to stdout");
                    Box::new(io::stdout())
                }
            },
        };
        handles.insert(dest.clone(), Sink::Sequential(sink));
    }
    if let Some(Sink::Sequential(writer)) = handles.get_mut(dest)
        && let Err(error) = writer.write_all(data)
    {
        warn!(%error, "stream write failed");
    }
}

fn p_is_stdout(path: &std::path::Path) -> bool {
    path == std::path::Path::new("-")
}
