//! Command-line surface.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cliant", version, about = "A parallel HTTP downloader")]
pub struct Cli {
    /// URLs to fetch. May be empty if `-i` supplies the whole list.
    pub urls: Vec<String>,

    /// Read additional URLs from a file (`-` for stdin), a remote URL, or a local path.
    #[arg(short = 'i', long = "input-file", value_name = "FILE")]
    pub input_file: Option<String>,

    /// Write to a single stream destination (`-` for stdout) instead of per-file paths.
    #[arg(short = 'O', long = "output-document", value_name = "FILE")]
    pub output_document: Option<String>,

    /// Base directory for non-stream destinations.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = ".")]
    pub output_dir: String,

    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'd', long)]
    pub debug: bool,

    #[arg(long = "max-redirect", default_value_t = 20)]
    pub max_redirect: usize,

    #[arg(short = 'U', long = "user-agent")]
    pub user_agent: Option<String>,

    /// HTTP Basic auth username. Requires `--password`.
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// HTTP Basic auth password. Requires `--user`.
    #[arg(long)]
    pub password: Option<String>,
}

impl Cli {
    pub fn is_stream(&self) -> bool {
        self.output_document.is_some()
    }
}
