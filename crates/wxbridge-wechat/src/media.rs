// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of outbound file payloads into bytes.
//!
//! A [`FileSource`] is turned into a buffer (inline base64, HTTP GET, or a
//! local read), its media type is sniffed from magic bytes with the file
//! extension as fallback, and a filename is derived for the upload.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use wxbridge_core::{BridgeError, FileSource};

/// An outbound file ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    pub bytes: Vec<u8>,
    pub name: String,
    pub mime: String,
    /// Printable description of where the bytes came from.
    pub source: String,
}

impl ResolvedFile {
    /// Size in KiB, for logs.
    pub fn size_kib(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

/// Magic-byte signatures: (offset, bytes, mime, extension).
const SIGNATURES: &[(usize, &[u8], &str, &str)] = &[
    (0, b"\x89PNG\r\n\x1a\n", "image/png", "png"),
    (0, b"\xff\xd8\xff", "image/jpeg", "jpg"),
    (0, b"GIF8", "image/gif", "gif"),
    (8, b"WEBP", "image/webp", "webp"),
    (0, b"BM", "image/bmp", "bmp"),
    (4, b"ftyp", "video/mp4", "mp4"),
    (0, b"\x1a\x45\xdf\xa3", "video/webm", "webm"),
    (0, b"ID3", "audio/mpeg", "mp3"),
    (0, b"\xff\xfb", "audio/mpeg", "mp3"),
    (0, b"OggS", "audio/ogg", "ogg"),
    (8, b"WAVE", "audio/wav", "wav"),
    (0, b"#!AMR", "audio/amr", "amr"),
    (0, b"#!SILK", "audio/silk", "silk"),
    (1, b"#!SILK", "audio/silk", "silk"),
    (0, b"%PDF", "application/pdf", "pdf"),
    (0, b"PK\x03\x04", "application/zip", "zip"),
];

/// Detects `(mime, extension)` from the leading bytes.
pub fn sniff(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    SIGNATURES
        .iter()
        .find(|(offset, magic, _, _)| {
            bytes
                .get(*offset..*offset + magic.len())
                .is_some_and(|window| window == *magic)
        })
        .map(|(_, _, mime, ext)| (*mime, *ext))
}

/// The file name carried by the source itself, if it has one with an extension.
pub fn source_file_name(source: &FileSource) -> Option<String> {
    let name = match source {
        FileSource::Base64(_) => return None,
        FileSource::Url(url) => url::Url::parse(url)
            .ok()?
            .path_segments()?
            .next_back()?
            .to_string(),
        FileSource::Path(path) => path.file_name()?.to_string_lossy().into_owned(),
    };
    Path::new(&name).extension().is_some().then_some(name)
}

/// Picks the upload filename and mime type.
///
/// Order of preference for the name: explicit hint, the source's own file
/// name, then `<uuid>.<ext>` with the extension taken from the sniffed type.
pub fn describe(bytes: &[u8], source: &FileSource, hint: Option<&str>) -> (String, String) {
    let named = hint
        .filter(|h| !h.trim().is_empty())
        .map(str::to_string)
        .or_else(|| source_file_name(source));
    let sniffed = sniff(bytes);

    let mime = match (sniffed, &named) {
        (Some((mime, _)), _) => mime.to_string(),
        (None, Some(name)) => mime_guess::from_path(name)
            .first_or_octet_stream()
            .to_string(),
        (None, None) => "application/octet-stream".to_string(),
    };

    let name = named.unwrap_or_else(|| {
        let ext = sniffed.map(|(_, ext)| ext).unwrap_or("bin");
        format!("{}.{ext}", uuid::Uuid::new_v4())
    });
    (name, mime)
}

/// Fetches file payloads over HTTP and from disk.
#[derive(Debug, Clone, Default)]
pub struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolves `source` into an upload-ready file.
    pub async fn resolve(
        &self,
        source: &FileSource,
        hint: Option<&str>,
    ) -> Result<ResolvedFile, BridgeError> {
        let bytes = match source {
            FileSource::Base64(data) => STANDARD
                .decode(data.trim())
                .map_err(|e| BridgeError::media("invalid base64 payload", e))?,
            FileSource::Url(url) => self.fetch(url).await?,
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| BridgeError::media(format!("cannot read {}", path.display()), e))?,
        };
        let (name, mime) = describe(&bytes, source, hint);
        debug!(name = %name, mime = %mime, size = bytes.len(), "resolved outbound file");
        Ok(ResolvedFile {
            bytes,
            name,
            mime,
            source: source.to_string(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BridgeError::media(format!("failed to fetch {url}"), e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::media(format!("failed to read body of {url}"), e))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn sniffs_common_types() {
        assert_eq!(sniff(PNG), Some(("image/png", "png")));
        assert_eq!(sniff(b"\xff\xd8\xff\xe0rest"), Some(("image/jpeg", "jpg")));
        assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8"), Some(("image/webp", "webp")));
        assert_eq!(sniff(b"\0\0\0\x18ftypmp42"), Some(("video/mp4", "mp4")));
        assert_eq!(sniff(b"\x02#!SILK_V3"), Some(("audio/silk", "silk")));
        assert_eq!(sniff(b"hello"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn name_prefers_hint_then_source_then_generated() {
        let url = FileSource::Url("https://cdn.example/a/cat.png?x=1".into());
        assert_eq!(describe(PNG, &url, Some("dog.png")).0, "dog.png");
        assert_eq!(describe(PNG, &url, None).0, "cat.png");

        let inline = FileSource::Base64(String::new());
        let (name, mime) = describe(PNG, &inline, None);
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + ".png".len());
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn extension_used_when_magic_unknown() {
        let path = FileSource::Path("/tmp/report.txt".into());
        let (name, mime) = describe(b"plain words", &path, None);
        assert_eq!(name, "report.txt");
        assert_eq!(mime, "text/plain");

        let (name, mime) = describe(b"plain words", &FileSource::Base64(String::new()), None);
        assert!(name.ends_with(".bin"));
        assert_eq!(mime, "application/octet-stream");
    }

    #[test]
    fn url_without_extension_has_no_source_name() {
        let url = FileSource::Url("https://cdn.example/download".into());
        assert_eq!(source_file_name(&url), None);
    }

    #[tokio::test]
    async fn resolves_base64() {
        let fetcher = MediaFetcher::default();
        let file = fetcher
            .resolve(&FileSource::Base64(STANDARD.encode(PNG)), None)
            .await
            .unwrap();
        assert_eq!(file.bytes, PNG);
        assert_eq!(file.mime, "image/png");
        assert_eq!(file.source, "base64://...");
    }

    #[tokio::test]
    async fn invalid_base64_is_media_error() {
        let err = MediaFetcher::default()
            .resolve(&FileSource::Base64("***".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Media { .. }));
    }

    #[tokio::test]
    async fn resolves_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("pic.png");
        std::fs::write(&file_path, PNG).unwrap();
        let file = MediaFetcher::default()
            .resolve(&FileSource::Path(file_path), None)
            .await
            .unwrap();
        assert_eq!(file.name, "pic.png");
        assert_eq!(file.size_kib(), PNG.len() as f64 / 1024.0);
    }

    #[tokio::test]
    async fn fetches_remote_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG))
            .mount(&server)
            .await;

        let url = format!("{}/media/cat.png", server.uri());
        let file = MediaFetcher::default()
            .resolve(&FileSource::Url(url), None)
            .await
            .unwrap();
        assert_eq!(file.bytes, PNG);
        assert_eq!(file.name, "cat.png");
    }

    #[tokio::test]
    async fn remote_error_status_is_media_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = MediaFetcher::default()
            .resolve(&FileSource::Url(format!("{}/missing.png", server.uri())), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to fetch"));
    }
}
