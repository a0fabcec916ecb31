//! The Printer: the single thread that renders progress and errors.

use std::sync::mpsc::Receiver;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// One message produced by a task for human consumption.
#[derive(Debug, Clone)]
pub struct PrintTask {
    pub message: String,
    pub error: bool,
    pub total_parts: Option<u64>,
    pub warning: bool,
}

impl PrintTask {
    pub fn success(message: impl Into<String>) -> Self {
        PrintTask {
            message: message.into(),
            error: false,
            total_parts: None,
            warning: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        PrintTask {
            message: message.into(),
            error: true,
            total_parts: None,
            warning: false,
        }
    }

    pub fn with_total_parts(mut self, total_parts: u64) -> Self {
        self.total_parts = Some(total_parts);
        self
    }
}

/// Tallies produced while draining the result channel, handed back to the
/// Handler once the channel closes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintSummary {
    pub num_tasks_failed: u32,
    pub num_tasks_warned: u32,
}

/// Runs on its own thread until `rx` disconnects. `quiet` suppresses the
/// progress bar (used for stream destinations, where stdout is the payload).
///
/// Every [`PrintTask`] with `total_parts` set is live part-level progress,
/// shown only on the spinner; every other one is a terminal per-file outcome
/// and gets its own persisted line, per the one-line-per-file contract.
pub fn run(rx: Receiver<PrintTask>, quiet: bool) -> PrintSummary {
    let mut summary = PrintSummary::default();
    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Some(bar)
    };

    for task in rx {
        if task.error {
            summary.num_tasks_failed += 1;
        } else if task.warning {
            summary.num_tasks_warned += 1;
        }

        let line = if task.error {
            task.message.red().to_string()
        } else if task.warning {
            task.message.yellow().to_string()
        } else {
            task.message.green().to_string()
        };

        if let Some(total) = task.total_parts {
            if let Some(bar) = &bar {
                bar.set_message(format!("{line} ({total} parts)"));
                bar.tick();
            }
            continue;
        }

        match &bar {
            Some(bar) => bar.println(line),
            None if task.error => eprintln!("{line}"),
            None => {}
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    summary
}
