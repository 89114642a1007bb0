//! Request body sources: multipart-wrapped file, raw file, literal string.
//!
//! # Design
//! Exactly one source wins, in priority order: an upload file wrapped as
//! multipart, an upload file sent as-is, then the literal body (already
//! dropped by validation for methods that carry none). The chosen source is
//! a boxed `Read` that owns its file handle, so the handle is released as
//! soon as the source is dropped, whether or not the request was sent.
//!
//! The multipart encoder streams: a preamble, the file through a
//! `BufReader`, and the closing boundary are chained readers, so the file
//! is never loaded into memory.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{RequestError, Result};
use crate::validate::ValidatedRequest;

pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Which source produced the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Literal,
    File,
    Multipart,
}

/// The outgoing payload and the content type its encoder dictates.
pub struct BodySource {
    kind: BodyKind,
    content_type: Option<String>,
    len: Option<u64>,
    reader: Option<Box<dyn Read + Send + Sync>>,
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodySource")
            .field("kind", &self.kind)
            .field("content_type", &self.content_type)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl BodySource {
    pub fn empty() -> Self {
        Self {
            kind: BodyKind::Empty,
            content_type: None,
            len: None,
            reader: None,
        }
    }

    pub fn literal(body: String) -> Self {
        Self {
            kind: BodyKind::Literal,
            content_type: None,
            len: Some(body.len() as u64),
            reader: Some(Box::new(Cursor::new(body.into_bytes()))),
        }
    }

    /// Stream the file at `path` verbatim as `application/octet-stream`.
    pub fn file(path: &Path) -> Result<Self> {
        let (file, len) = open_upload(path)?;
        Ok(Self {
            kind: BodyKind::File,
            content_type: Some(APPLICATION_OCTET_STREAM.to_string()),
            len: Some(len),
            reader: Some(Box::new(BufReader::new(file))),
        })
    }

    /// Wrap the file at `path` as the single form field `field`.
    pub fn multipart(path: &Path, field: &str) -> Result<Self> {
        let (file, len) = open_upload(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let form = MultipartForm::new(field, &file_name);
        Ok(Self {
            kind: BodyKind::Multipart,
            content_type: Some(form.content_type()),
            len: Some(form.encoded_len(len)),
            reader: Some(form.into_reader(BufReader::new(file))),
        })
    }

    /// Pick the source for a validated request.
    pub fn build(request: &ValidatedRequest) -> Result<Self> {
        let params = &request.params;
        if !params.upload_file.is_empty() {
            let path = absolute(&params.upload_file)?;
            return if params.wrap_as_multipart {
                Self::multipart(&path, params.multipart_field())
            } else {
                Self::file(&path)
            };
        }
        Ok(match &request.body {
            Some(body) => Self::literal(body.clone()),
            None => Self::empty(),
        })
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Encoded length in bytes, when known up front.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_none()
    }

    pub fn into_reader(self) -> Option<Box<dyn Read + Send + Sync>> {
        self.reader
    }
}

fn absolute(raw: &str) -> Result<PathBuf> {
    std::path::absolute(raw)
        .map_err(|e| RequestError::BodyError(format!("upload file '{raw}': {e}")))
}

fn open_upload(path: &Path) -> Result<(File, u64)> {
    let body_error =
        |e: io::Error| RequestError::BodyError(format!("upload file {}: {e}", path.display()));
    let file = File::open(path).map_err(body_error)?;
    let meta = file.metadata().map_err(body_error)?;
    if !meta.is_file() {
        return Err(RequestError::BodyError(format!(
            "upload file {}: not a regular file",
            path.display()
        )));
    }
    Ok((file, meta.len()))
}

/// A `multipart/form-data` envelope around one file field.
struct MultipartForm {
    boundary: String,
    preamble: Vec<u8>,
    epilogue: Vec<u8>,
}

impl MultipartForm {
    fn new(field: &str, file_name: &str) -> Self {
        let boundary = format!("http-request-plugin-{}", Uuid::new_v4().simple());
        let preamble = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: {APPLICATION_OCTET_STREAM}\r\n\r\n",
            escape_quoted(field),
            escape_quoted(file_name),
        )
        .into_bytes();
        let epilogue = format!("\r\n--{boundary}--\r\n").into_bytes();
        Self {
            boundary,
            preamble,
            epilogue,
        }
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn encoded_len(&self, content_len: u64) -> u64 {
        self.preamble.len() as u64 + content_len + self.epilogue.len() as u64
    }

    fn into_reader<R>(self, content: R) -> Box<dyn Read + Send + Sync>
    where
        R: Read + Send + Sync + 'static,
    {
        Box::new(
            Cursor::new(self.preamble)
                .chain(content)
                .chain(Cursor::new(self.epilogue)),
        )
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "%22")
        .replace(['\r', '\n'], " ")
}
