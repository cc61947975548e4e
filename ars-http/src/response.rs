//! Response types returned by the executor and facades.

use std::fmt;
use std::io::{self, Read};

use reqwest::header::HeaderMap;
use reqwest::Version;
use serde::de::DeserializeOwned;
use serde_json::Value;

use ars_core::constants::{content_type, CHUNK_SIZE};
use ars_core::error::{ArsError, ArsResult};

use crate::transport::TransportResponse;

/// Status line and headers of a received response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub reason: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
}

impl ResponseEnvelope {
    pub fn from_transport(response: &TransportResponse) -> Self {
        Self {
            status: response.status,
            reason: response.reason().to_string(),
            version: response.version,
            headers: response.headers.clone(),
            content_type: response.content_type(),
        }
    }

    /// A single header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the payload is binary and must not be read as text.
    pub fn is_octet_stream(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains(content_type::OCTET_STREAM))
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains(content_type::JSON))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response payload: already read text, or a byte stream left for the caller.
pub enum ResponseBody {
    Buffered(String),
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(text) => f.debug_tuple("Buffered").field(text).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl ResponseBody {
    /// Buffered text, `None` for streams.
    pub fn text(&self) -> Option<&str> {
        match self {
            ResponseBody::Buffered(text) => Some(text),
            ResponseBody::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, ResponseBody::Stream(_))
    }

    /// Consume the body as fixed-size chunks.
    pub fn chunks(self) -> BodyChunks {
        let source = match self {
            ResponseBody::Buffered(text) => ChunkSource::Buffered {
                data: text.into_bytes(),
                pos: 0,
            },
            ResponseBody::Stream(reader) => ChunkSource::Stream(reader),
        };
        BodyChunks { source }
    }

    /// Read the whole body into memory.
    pub fn into_bytes(self) -> ArsResult<Vec<u8>> {
        match self {
            ResponseBody::Buffered(text) => Ok(text.into_bytes()),
            ResponseBody::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    /// Read the whole body as text, replacing invalid UTF-8.
    pub fn into_text(self) -> ArsResult<String> {
        match self {
            ResponseBody::Buffered(text) => Ok(text),
            ResponseBody::Stream(reader) => Ok(read_text(reader)?),
        }
    }
}

/// Iterator over body chunks of at most [`CHUNK_SIZE`] bytes.
pub struct BodyChunks {
    source: ChunkSource,
}

enum ChunkSource {
    Buffered { data: Vec<u8>, pos: usize },
    Stream(Box<dyn Read + Send>),
    Done,
}

impl Iterator for BodyChunks {
    type Item = ArsResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            ChunkSource::Buffered { data, pos } => {
                if *pos >= data.len() {
                    self.source = ChunkSource::Done;
                    return None;
                }
                let end = (*pos + CHUNK_SIZE).min(data.len());
                let chunk = data[*pos..end].to_vec();
                *pos = end;
                Some(Ok(chunk))
            }
            ChunkSource::Stream(reader) => match read_chunk(reader.as_mut()) {
                Ok(chunk) if chunk.is_empty() => {
                    self.source = ChunkSource::Done;
                    None
                }
                Ok(chunk) => Some(Ok(chunk)),
                Err(e) => {
                    self.source = ChunkSource::Done;
                    Some(Err(ArsError::Io(e)))
                }
            },
            ChunkSource::Done => None,
        }
    }
}

/// Read up to one chunk. An empty result means end of stream.
fn read_chunk(reader: &mut (dyn Read + Send)) -> io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(CHUNK_SIZE);
    reader.take(CHUNK_SIZE as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}

/// Drain a reader chunk by chunk into text.
pub(crate) fn read_text<R: Read>(mut reader: R) -> io::Result<String> {
    let mut data = Vec::new();
    loop {
        let read = (&mut reader).take(CHUNK_SIZE as u64).read_to_end(&mut data)?;
        if read == 0 {
            break;
        }
    }
    Ok(match String::from_utf8(data) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Outcome of decoding a JSON facade response.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonBody {
    /// 204/205 or no content type; nothing was decoded.
    Empty,
    /// Successfully decoded document.
    Json(Value),
    /// Declared JSON but failed to decode; the raw text is kept.
    Undecodable(String),
    /// Some other content type.
    NotJson,
}

impl JsonBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            JsonBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            JsonBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, JsonBody::Empty)
    }

    /// Deserialize the decoded document into `T`. `None` when there is none.
    pub fn parse<T: DeserializeOwned>(&self) -> ArsResult<Option<T>> {
        match self {
            JsonBody::Json(value) => Ok(Some(T::deserialize(value)?)),
            _ => Ok(None),
        }
    }
}
