//! Top-level entry point: turns a list of [`FileRef`]s into queued tasks,
//! drives the executor through to shutdown, and reports the outcome.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use reqwest::blocking::Client;
use tracing::{debug, error};
use url::Url;

use crate::config::{RunConfig, find_chunksize};
use crate::executor::Executor;
use crate::file_ref::FileRef;
use crate::part_context::PartContext;
use crate::printer::{PrintSummary, PrintTask};
use crate::queue::{IMMEDIATE_SHUTDOWN, SHUTDOWN};
use crate::tasks::{BasicTask, CompleteDownloadTask, CreateLocalFileTask, DownloadPartTask, Task};

/// `(num_tasks_failed, num_tasks_warned)`, mirroring the engine's result
/// contract. The process exit code is non-zero whenever the first is.
pub struct CommandResult {
    pub num_tasks_failed: u32,
    pub num_tasks_warned: u32,
}

pub struct Handler {
    client: Client,
    config: RunConfig,
}

impl Handler {
    pub fn new(client: Client, config: RunConfig) -> Self {
        Handler { client, config }
    }

    pub fn run(&self, files: Vec<FileRef>) -> CommandResult {
        let executor = Executor::start(
            self.config.num_threads,
            self.config.max_queue_size,
            self.config.max_io_queue_size,
            self.config.quiet,
            self.config.stream_sink.clone(),
        );

        let mut multipart_downloads: Vec<(Arc<PartContext>, PathBuf)> = Vec::new();

        match self.enqueue_all(&executor, files, &mut multipart_downloads) {
            Ok(()) => {
                executor.initiate_shutdown(SHUTDOWN);
                let summary = executor.wait_until_shutdown();
                self.cleanup(&multipart_downloads);
                self.into_result(summary)
            }
            Err(error) => {
                error!(%error, "fatal error while enqueueing tasks");
                let print_tx = executor.print_sender();
                let _ = print_tx.send(PrintTask::failure(error.to_string()));
                executor.initiate_shutdown(IMMEDIATE_SHUTDOWN);
                let summary = executor.wait_until_shutdown();
                self.cleanup(&multipart_downloads);
                self.into_result(summary)
            }
        }
    }

    fn enqueue_all(
        &self,
        executor: &Executor,
        files: Vec<FileRef>,
        multipart_downloads: &mut Vec<(Arc<PartContext>, PathBuf)>,
    ) -> Result<()> {
        for mut filename in files {
            if filename.size.is_none() {
                self.probe_size(&mut filename)?;
            }

            let is_multipart = filename
                .size
                .is_some_and(|size| size > self.config.multi_threshold);

            if is_multipart {
                self.enqueue_multipart(executor, filename, multipart_downloads);
            } else {
                executor.submit(
                    crate::queue::BASIC,
                    Task::Basic(BasicTask {
                        client: self.client.clone(),
                        filename,
                        print_tx: executor.print_sender(),
                        write_tx: executor.write_sender(),
                    }),
                );
            }
        }
        Ok(())
    }

    /// A stream destination needs its size before multipart eligibility can
    /// be decided, since there's no local file stat to fall back on; issue a
    /// HEAD request to learn it.
    fn probe_size(&self, filename: &mut FileRef) -> Result<()> {
        let response = self.client.head(filename.src.clone()).send()?;
        filename.ingest_headers(&response);
        Ok(())
    }

    fn enqueue_multipart(
        &self,
        executor: &Executor,
        filename: FileRef,
        multipart_downloads: &mut Vec<(Arc<PartContext>, PathBuf)>,
    ) {
        let size = filename.size.expect("multipart eligibility requires a known size");
        let chunksize = find_chunksize(size, self.config.chunksize);
        let num_parts = size.div_ceil(chunksize).max(1);

        let context = Arc::new(PartContext::new(num_parts));
        let is_stream = filename.is_stream;
        let filename = Arc::new(filename);

        if is_stream {
            // No local file to create: the stream destination is ready as
            // soon as the context exists, so unblock part tasks immediately.
            context.announce_file_created();
        } else {
            executor.submit(
                crate::queue::CREATE_COMPLETE,
                Task::CreateLocalFile(CreateLocalFileTask {
                    context: Arc::clone(&context),
                    filename: Arc::clone(&filename),
                }),
            );
        }

        for part_number in 0..num_parts {
            executor.submit(
                crate::queue::PART,
                Task::DownloadPart(DownloadPartTask {
                    part_number,
                    chunk_size: chunksize,
                    num_parts,
                    client: self.client.clone(),
                    filename: Arc::clone(&filename),
                    context: Arc::clone(&context),
                    write_tx: executor.write_sender(),
                    print_tx: executor.print_sender(),
                }),
            );
        }

        executor.submit(
            crate::queue::CREATE_COMPLETE,
            Task::Complete(CompleteDownloadTask {
                context: Arc::clone(&context),
                filename: Arc::clone(&filename),
                print_tx: executor.print_sender(),
                write_tx: executor.write_sender(),
            }),
        );

        if !is_stream {
            multipart_downloads.push((context, filename.io_key()));
        }
    }

    /// Deletes any multipart destination left in an inconsistent state
    /// (started but never completed) and cancels its context so nothing is
    /// left waiting.
    fn cleanup(&self, multipart_downloads: &[(Arc<PartContext>, PathBuf)]) {
        for (context, dest) in multipart_downloads {
            if (context.is_cancelled() || context.is_started()) && dest.exists() {
                debug!(?dest, "removing partially-downloaded file");
                let _ = fs::remove_file(dest);
            }
            context.cancel();
        }
    }

    fn into_result(&self, summary: PrintSummary) -> CommandResult {
        CommandResult {
            num_tasks_failed: summary.num_tasks_failed,
            num_tasks_warned: summary.num_tasks_warned,
        }
    }
}

/// Builds one [`FileRef`] per URL, applying `-o`/`-O` destination rules.
pub fn build_file_refs(urls: &[String], output_dir: &str, output_document: Option<&str>) -> Result<Vec<FileRef>> {
    let mut refs = Vec::with_capacity(urls.len());
    for url in urls {
        let parsed = Url::parse(url)?;
        let file_ref = match output_document {
            Some(_) => FileRef::new_stream(parsed),
            None => {
                let filename = parsed
                    .path_segments()
                    .and_then(|segments| segments.last())
                    .filter(|name| !name.is_empty())
                    .unwrap_or("index.html");
                let dest = PathBuf::from(output_dir).join(filename);
                FileRef::new(parsed, dest)
            }
        };
        refs.push(file_ref);
    }
    Ok(refs)
}
