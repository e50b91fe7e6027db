//! HTTP/1.1 message parsing
//!
//! Incremental parsers for requests and responses. Bytes are fed as they
//! arrive; a parser yields a message once its head and `Content-Length` body
//! are complete. Anything past the end of the message stays buffered and can
//! be taken with `take_remaining`, which is how the first HTTP/2 bytes after
//! a `101 Switching Protocols` are recovered.

use super::{
    Error, Headers, HttpRequest, HttpResponse, Method, Result, Status, Version, MAX_HEAD_SIZE,
};

/// Find the end of a message head (`\r\n\r\n`), returning the offset just past it
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Parse HTTP request line
///
/// Format: METHOD URI VERSION
pub fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let [method, uri, version] = parts.as_slice() else {
        return Err(Error::Parse(format!(
            "Invalid request line: expected 3 parts, got {}",
            parts.len()
        )));
    };

    Ok((method.parse()?, uri.to_string(), version.parse()?))
}

/// Parse HTTP response status line
///
/// Format: VERSION STATUS [REASON]
pub fn parse_status_line(line: &str) -> Result<(Version, Status, String)> {
    let mut parts = line.splitn(3, ' ');

    let version = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Parse(format!("Invalid status line: {:?}", line)))?
        .parse()?;

    let code = parts
        .next()
        .ok_or_else(|| Error::Parse(format!("Invalid status line: {:?}", line)))?;
    let status = Status::new(
        code.parse::<u16>()
            .map_err(|_| Error::Parse(format!("Invalid status code: {}", code)))?,
    )?;

    let reason = match parts.next() {
        Some(reason) => reason.to_string(),
        None => status.reason_phrase().to_string(),
    };

    Ok((version, status, reason))
}

/// Split a complete head into its start line and header fields
fn parse_head(head: &[u8]) -> Result<(String, Headers)> {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n").filter(|l| !l.is_empty());

    let start = lines
        .next()
        .ok_or_else(|| Error::Parse("Empty message head".to_string()))?
        .to_string();

    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = Headers::parse_header_line(line)?;
        headers.insert(name, value);
    }

    Ok((start, headers))
}

fn content_length(headers: &Headers) -> Result<usize> {
    match headers.get("Content-Length") {
        Some(cl) => cl
            .parse::<usize>()
            .map_err(|_| Error::Parse(format!("Invalid Content-Length: {}", cl))),
        None => Ok(0),
    }
}

/// Locate and parse the head once it is fully buffered
fn take_head(buffer: &mut Vec<u8>) -> Result<Option<(String, Headers)>> {
    match find_head_end(buffer) {
        Some(end) => {
            let head: Vec<u8> = buffer.drain(..end).collect();
            parse_head(&head).map(Some)
        }
        None if buffer.len() > MAX_HEAD_SIZE => Err(Error::HeadTooLarge(buffer.len())),
        None => Ok(None),
    }
}

struct PendingRequest {
    method: Method,
    uri: String,
    version: Version,
    headers: Headers,
    body_len: usize,
}

/// HTTP request parser
#[derive(Default)]
pub struct RequestParser {
    buffer: Vec<u8>,
    pending: Option<PendingRequest>,
}

impl RequestParser {
    /// Create a new request parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data to the parser
    ///
    /// Returns Ok(Some(request)) when a complete request is parsed,
    /// Ok(None) if more data is needed, or Err on parse error.
    pub fn parse(&mut self, data: &[u8]) -> Result<Option<HttpRequest>> {
        self.buffer.extend_from_slice(data);

        if self.pending.is_none() {
            let Some((start, headers)) = take_head(&mut self.buffer)? else {
                return Ok(None);
            };
            let (method, uri, version) = parse_request_line(&start)?;
            let body_len = content_length(&headers)?;
            self.pending = Some(PendingRequest {
                method,
                uri,
                version,
                headers,
                body_len,
            });
        }

        match self.pending.take() {
            Some(req) if self.buffer.len() >= req.body_len => {
                let body = self.buffer.drain(..req.body_len).collect();
                Ok(Some(
                    HttpRequest::builder()
                        .method(req.method)
                        .uri(req.uri)
                        .version(req.version)
                        .headers(req.headers)
                        .body(body)
                        .build(),
                ))
            }
            incomplete => {
                self.pending = incomplete;
                Ok(None)
            }
        }
    }

    /// Take bytes buffered past the last complete request
    pub fn take_remaining(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

struct PendingResponse {
    version: Version,
    status: Status,
    reason: String,
    headers: Headers,
    body_len: usize,
}

impl PendingResponse {
    fn into_response(self, body: Vec<u8>) -> HttpResponse {
        HttpResponse::builder()
            .version(self.version)
            .status(self.status)
            .reason(self.reason)
            .headers(self.headers)
            .body(body)
            .build()
    }
}

/// HTTP response parser
#[derive(Default)]
pub struct ResponseParser {
    buffer: Vec<u8>,
    pending: Option<PendingResponse>,
}

impl ResponseParser {
    /// Create a new response parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data to the parser
    ///
    /// Returns Ok(Some(response)) when a complete response is parsed,
    /// Ok(None) if more data is needed, or Err on parse error.
    ///
    /// 1xx, 204 and 304 responses never carry a body; for those the message
    /// ends with the head and every following byte is left buffered.
    pub fn parse(&mut self, data: &[u8]) -> Result<Option<HttpResponse>> {
        self.buffer.extend_from_slice(data);
        self.fill_head()?;

        match self.pending.take() {
            Some(resp) if self.buffer.len() >= resp.body_len => {
                let body = self.buffer.drain(..resp.body_len).collect();
                Ok(Some(resp.into_response(body)))
            }
            incomplete => {
                self.pending = incomplete;
                Ok(None)
            }
        }
    }

    /// Feed data until the response head is complete
    ///
    /// The returned response has an empty body. Body bytes received so far
    /// stay buffered and are not waited for.
    pub fn parse_head(&mut self, data: &[u8]) -> Result<Option<HttpResponse>> {
        self.buffer.extend_from_slice(data);
        self.fill_head()?;

        Ok(self
            .pending
            .take()
            .map(|resp| resp.into_response(Vec::new())))
    }

    fn fill_head(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }
        let Some((start, headers)) = take_head(&mut self.buffer)? else {
            return Ok(());
        };
        let (version, status, reason) = parse_status_line(&start)?;
        let body_len = if status.is_informational() || matches!(status.code(), 204 | 304) {
            0
        } else {
            content_length(&headers)?
        };
        self.pending = Some(PendingResponse {
            version,
            status,
            reason,
            headers,
            body_len,
        });
        Ok(())
    }

    /// Take bytes buffered past the last complete response
    pub fn take_remaining(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}
