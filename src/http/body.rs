//! Response and request body types
//!
//! Responses are either a single buffer or a file streamed in fixed-size
//! chunks; both are erased behind one boxed body type.

use futures_util::stream;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Boxed error for request bodies of any origin
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every response produced by this crate
pub type ResponseBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Request body after type erasure
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

const FILE_CHUNK_SIZE: usize = 64 * 1024;

pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream an open file as the response body
pub fn file(file: File) -> ResponseBody {
    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((Frame::data(Bytes::from(buf)), file)))
    });
    StreamBody::new(chunks).boxed_unsync()
}
