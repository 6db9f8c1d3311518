//! Transport-neutral view of the parts of one upload request.
//!
//! HTTP feeds the pipeline from a multipart form; the `import` command and the tests
//! feed it from memory through [`BufferedSource`].

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::io;

use crate::error::PipelineError;

/// One part of an upload request. Parts without a `file_name` are plain form fields.
pub struct IncomingPart<'a> {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: BoxStream<'a, io::Result<Bytes>>,
}

/// Yields request parts in order. A part's body must be consumed or dropped before the
/// next part is requested.
pub trait UploadSource: Send {
    fn next_part(
        &mut self,
    ) -> impl Future<Output = Result<Option<IncomingPart<'_>>, PipelineError>> + Send;
}

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct BufferedPart {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

/// An upload request held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedSource {
    parts: VecDeque<BufferedPart>,
}

impl BufferedSource {
    pub fn new(parts: Vec<BufferedPart>) -> Self {
        Self {
            parts: parts.into(),
        }
    }

    pub fn single_file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::new(vec![BufferedPart::file(file_name, content_type, data)])
    }
}

impl BufferedPart {
    pub fn file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn field(value: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: "text/plain".to_string(),
            data: value.into(),
        }
    }
}

impl UploadSource for BufferedSource {
    async fn next_part(&mut self) -> Result<Option<IncomingPart<'_>>, PipelineError> {
        let Some(part) = self.parts.pop_front() else {
            return Ok(None);
        };

        let chunks: Vec<io::Result<Bytes>> = (0..part.data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(part.data.slice(start..(start + CHUNK_SIZE).min(part.data.len()))))
            .collect();

        Ok(Some(IncomingPart {
            file_name: part.file_name,
            content_type: part.content_type,
            body: stream::iter(chunks).boxed(),
        }))
    }
}
