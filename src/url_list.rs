//! Resolves the `-i`/`--input-file` argument into a flat list of URLs.

use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;

/// Reads the source named by `input_file` and splits it into trimmed,
/// non-blank lines.
///
/// `-` reads stdin; a value parseable as a URL is fetched over HTTP; anything
/// else is treated as a local path.
pub fn read_list(input_file: &str, client: &Client) -> Result<Vec<String>> {
    let body = if input_file == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read URL list from stdin")?;
        buf
    } else if let Ok(url) = Url::parse(input_file) {
        client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .context("failed to fetch remote URL list")?
            .text()
            .context("remote URL list response was not valid text")?
    } else {
        fs::read_to_string(input_file)
            .with_context(|| format!("failed to read URL list file {input_file:?}"))?
    };

    Ok(body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn splits_trims_and_drops_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  https://a.example/1  \n\nhttps://a.example/2\n   \n").unwrap();
        let client = Client::new();
        let urls = read_list(file.path().to_str().unwrap(), &client).unwrap();
        assert_eq!(urls, vec!["https://a.example/1", "https://a.example/2"]);
    }
}
