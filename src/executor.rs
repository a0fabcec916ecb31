//! Worker pool pulling [`crate::tasks::Task`]s from a [`StablePriorityQueue`];
//! owns the Writer and Printer threads and the shutdown sequence.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::io::{self, IoRequest};
use crate::printer::{self, PrintSummary, PrintTask};
use crate::queue::StablePriorityQueue;
use crate::tasks::Task;

/// Running instance of the engine's pipeline: `num_threads` workers, one
/// Writer thread, one Printer thread, all fed from bounded channels/queues.
pub struct Executor {
    queue: Arc<StablePriorityQueue<Task>>,
    write_tx: mpsc::SyncSender<IoRequest>,
    print_tx: mpsc::SyncSender<PrintTask>,
    workers: Vec<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    printer: Option<JoinHandle<PrintSummary>>,
    num_threads: usize,
}

impl Executor {
    pub fn start(
        num_threads: usize,
        max_queue_size: usize,
        max_io_queue_size: usize,
        quiet: bool,
        stream_sink: Option<PathBuf>,
    ) -> Self {
        let queue = Arc::new(StablePriorityQueue::new(max_queue_size));
        let (write_tx, write_rx) = mpsc::sync_channel(max_io_queue_size);
        let (print_tx, print_rx) = mpsc::sync_channel(max_io_queue_size);

        let writer = thread::spawn(move || io::run(write_rx, stream_sink));
        let printer = thread::spawn(move || printer::run(print_rx, quiet));

        let workers = (0..num_threads)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let print_tx = print_tx.clone();
                thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn(move || worker_loop(queue, print_tx))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Executor {
            queue,
            write_tx,
            print_tx,
            workers,
            writer: Some(writer),
            printer: Some(printer),
            num_threads,
        }
    }

    pub fn submit(&self, priority: u8, task: Task) {
        self.queue.put(priority, task);
    }

    pub fn write_sender(&self) -> mpsc::SyncSender<IoRequest> {
        self.write_tx.clone()
    }

    pub fn print_sender(&self) -> mpsc::SyncSender<PrintTask> {
        self.print_tx.clone()
    }

    /// Enqueues one [`Task::Shutdown`] sentinel per worker at `priority`.
    /// Pass `IMMEDIATE_SHUTDOWN` to pre-empt queued work, or `SHUTDOWN` to
    /// drain it first (see [`crate::queue`]).
    pub fn initiate_shutdown(&self, priority: u8) {
        debug!(priority, "initiating shutdown");
        for _ in 0..self.num_threads {
            self.queue.put(priority, Task::Shutdown);
        }
    }

    /// Joins every worker, then drops this executor's own channel senders
    /// and joins Printer and Writer. Any sender clones a task handed out are
    /// dropped when that task finishes running, so once the workers have
    /// joined, dropping these two is what lets both threads see their
    /// channel close and exit.
    pub fn wait_until_shutdown(mut self) -> PrintSummary {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }

        let Executor {
            write_tx,
            print_tx,
            writer,
            printer,
            ..
        } = self;
        drop(write_tx);
        drop(print_tx);

        let summary = printer
            .expect("printer thread started exactly once")
            .join()
            .unwrap_or_default();
        let _ = writer.expect("writer thread started exactly once").join();
        summary
    }
}

fn worker_loop(queue: Arc<StablePriorityQueue<Task>>, print_tx: mpsc::SyncSender<PrintTask>) {
    loop {
        let task = queue.get();
        if matches!(task, Task::Shutdown) {
            return;
        }
        if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.run())) {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%reason, "worker task panicked");
            let _ = print_tx.send(PrintTask::failure(format!("task failed: {reason}")));
        }
    }
}
