//! Checksum verification for single-part (non-multipart) transfers.

use reqwest::header::{ETAG, HeaderMap, SERVER};

/// What, if anything, this response's headers let us verify against.
pub enum Checksum {
    /// Compare the running MD5 against this lowercase hex digest.
    Verify(String),
    /// Multi-part ETag (contains `-`) or SSE-KMS response: not comparable.
    Unverifiable,
}

/// An ETag is only a plain MD5 of the object bytes on S3-family services;
/// ordinary HTTP servers mint it from mtime/inode or a weak validator, so
/// trusting it there would false-positive as a checksum mismatch.
fn server_is_s3_family(headers: &HeaderMap) -> bool {
    headers
        .get(SERVER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|server| {
            let server = server.to_ascii_lowercase();
            server.contains("amazons3") || server.contains("amazon s3") || server.contains("minio")
        })
}

/// Reads `ETag` (stripped of its surrounding quotes, S3-family servers only)
/// or `Content-MD5`, skipping verification for multi-part ETags and SSE-KMS
/// bodies, neither of which is a plain MD5 of the object bytes.
pub fn checksum_from_headers(headers: &HeaderMap) -> Checksum {
    if headers
        .get("x-amz-server-side-encryption")
        .and_then(|v| v.to_str().ok())
        == Some("aws:kms")
    {
        return Checksum::Unverifiable;
    }

    if server_is_s3_family(headers)
        && let Some(etag) = headers.get(ETAG).and_then(|v| v.to_str().ok())
    {
        let etag = etag.trim_matches('"');
        if etag.contains('-') {
            return Checksum::Unverifiable;
        }
        return Checksum::Verify(etag.to_string());
    }

    if let Some(md5_b64) = headers.get("Content-MD5").and_then(|v| v.to_str().ok())
        && let Some(hex) = base64_to_hex(md5_b64)
    {
        return Checksum::Verify(hex);
    }

    Checksum::Unverifiable
}

fn base64_to_hex(b64: &str) -> Option<String> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD.decode(b64).ok()?;
    if bytes.len() != 16 {
        return None;
    }
    Some(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Streaming MD5 accumulator: fed one chunk at a time as the Writer is told
/// about it, so the whole payload is never held in memory twice.
pub struct RunningMd5 {
    context: md5::Context,
}

impl RunningMd5 {
    pub fn new() -> Self {
        RunningMd5 {
            context: md5::Context::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.context.consume(chunk);
    }

    pub fn hexdigest(self) -> String {
        format!("{:x}", self.context.compute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_etag_is_verifiable_on_s3() {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "AmazonS3".parse().unwrap());
        headers.insert(ETAG, "\"d41d8cd98f00b204e9800998ecf8427e\"".parse().unwrap());
        match checksum_from_headers(&headers) {
            Checksum::Verify(hash) => assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e"),
            Checksum::Unverifiable => panic!("expected verifiable"),
        }
    }

    #[test]
    fn multipart_etag_is_unverifiable() {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "AmazonS3".parse().unwrap());
        headers.insert(ETAG, "\"abcd1234-3\"".parse().unwrap());
        assert!(matches!(
            checksum_from_headers(&headers),
            Checksum::Unverifiable
        ));
    }

    #[test]
    fn kms_encrypted_is_unverifiable() {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "AmazonS3".parse().unwrap());
        headers.insert(ETAG, "\"d41d8cd98f00b204e9800998ecf8427e\"".parse().unwrap());
        headers.insert("x-amz-server-side-encryption", "aws:kms".parse().unwrap());
        assert!(matches!(
            checksum_from_headers(&headers),
            Checksum::Unverifiable
        ));
    }

    #[test]
    fn non_s3_etag_is_ignored_in_favor_of_content_md5() {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "nginx/1.25.3".parse().unwrap());
        headers.insert(ETAG, "\"abc123-not-an-md5\"".parse().unwrap());
        assert!(matches!(
            checksum_from_headers(&headers),
            Checksum::Unverifiable
        ));

        headers.insert("Content-MD5", "1B2M2Y8AsgTpgAmY7PhCfg==".parse().unwrap());
        match checksum_from_headers(&headers) {
            Checksum::Verify(hash) => assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e"),
            Checksum::Unverifiable => panic!("expected verifiable from Content-MD5"),
        }
    }

    #[test]
    fn running_md5_matches_known_vector() {
        let mut md5 = RunningMd5::new();
        md5.update(b"");
        assert_eq!(md5.hexdigest(), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
