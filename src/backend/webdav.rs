use async_trait::async_trait;
use cinedex_common::SourceKind;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Method, Url};
use tracing::debug;

use super::{encode_path, Backend, BackendError, BackendResult, DirEntry};

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop><d:resourcetype/><d:getcontentlength/></d:prop>
</d:propfind>"#;

/// Backend for a WebDAV server.
///
/// Paths are server paths below the configured base URL.
pub struct WebDavBackend {
    client: reqwest::Client,
    /// Base URL without a trailing slash.
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl WebDavBackend {
    pub fn new(
        base_url: String,
        username: Option<String>,
        password: Option<String>,
    ) -> BackendResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, encode_path(path))
    }
}

#[async_trait]
impl Backend for WebDavBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Webdav
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<DirEntry>> {
        let url = self.url(path);
        let parsed = Url::parse(&url).map_err(|e| BackendError::InvalidPath(format!("{url}: {e}")))?;
        debug!(path, "WebDAV PROPFIND");

        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        let mut request = self
            .client
            .request(propfind, parsed.clone())
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = resp.text().await?;
        parse_multistatus(&body, parsed.path())
    }

    fn resolve_url(&self, path: &str) -> String {
        self.url(path)
    }
}

#[derive(Default)]
struct PropEntry {
    href: String,
    is_dir: bool,
    size: u64,
}

#[derive(Clone, Copy)]
enum Field {
    None,
    Href,
    Length,
}

/// Parse a `207 Multi-Status` PROPFIND response into directory entries,
/// dropping the entry for the listed directory itself.
fn parse_multistatus(body: &str, request_path: &str) -> BackendResult<Vec<DirEntry>> {
    let self_path = decode_href(request_path);
    let mut reader = Reader::from_str(body);
    let mut entries = Vec::new();
    let mut current: Option<PropEntry> = None;
    let mut field = Field::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => current = Some(PropEntry::default()),
                b"href" => field = Field::Href,
                b"getcontentlength" => field = Field::Length,
                b"collection" => {
                    if let Some(entry) = current.as_mut() {
                        entry.is_dir = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.is_dir = true;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| BackendError::Parse(e.to_string()))?;
                let text = text.trim();
                if let Some(entry) = current.as_mut() {
                    match field {
                        Field::Href => entry.href.push_str(text),
                        Field::Length => entry.size = text.parse().unwrap_or(0),
                        Field::None => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(entry) = current.take() {
                        if let Some(dir_entry) = to_dir_entry(entry, &self_path) {
                            entries.push(dir_entry);
                        }
                    }
                }
                b"href" | b"getcontentlength" => field = Field::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(BackendError::Parse(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}

fn to_dir_entry(entry: PropEntry, self_path: &str) -> Option<DirEntry> {
    let path = decode_href(&entry.href);
    if path == self_path {
        return None;
    }
    let name = path.rsplit('/').next().filter(|n| !n.is_empty())?;
    Some(if entry.is_dir {
        DirEntry::directory(name)
    } else {
        DirEntry::file(name, entry.size)
    })
}

/// Decoded path of an href, without a trailing slash. Absolute URLs are
/// reduced to their path.
fn decode_href(href: &str) -> String {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    let decoded = urlencoding::decode(&path)
        .map(|d| d.into_owned())
        .unwrap_or(path);
    decoded.trim_end_matches('/').to_string()
}
