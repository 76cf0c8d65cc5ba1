// Request/response handles passed to flows

use crate::http::{RequestBody, ResponseBody};
use hyper::{HeaderMap, Method, Response, Uri};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

/// Everything a flow may need beyond its [`FlowInput`](super::FlowInput)
pub struct FlowContext {
    /// Application value registered with `AppBuilder::shared`
    pub shared: Option<Arc<dyn Any + Send + Sync>>,
    pub request: RequestHandle,
    pub response: ResponseHandle,
}

impl FlowContext {
    /// Downcast the shared application value
    pub fn shared<T: Any>(&self) -> Option<&T> {
        self.shared.as_deref()?.downcast_ref::<T>()
    }
}

/// The raw request; the body can be taken exactly once
pub struct RequestHandle {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub peer: Option<SocketAddr>,
    body: Option<RequestBody>,
    body_limit: u64,
}

impl RequestHandle {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: RequestBody,
        body_limit: u64,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            peer: None,
            body: Some(body),
            body_limit,
        }
    }

    #[must_use]
    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    /// Take the request body; `None` once it has been consumed
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Maximum number of body bytes the body parsers accept
    pub const fn body_limit(&self) -> u64 {
        self.body_limit
    }
}

/// Write-once response slot
///
/// A flow that answers the client itself stores its response here and
/// returns a result with `http_sent` set.
#[derive(Clone, Default)]
pub struct ResponseHandle {
    slot: Arc<Mutex<Option<Response<ResponseBody>>>>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the response; hands it back if one was already sent
    pub fn send(&self, resp: Response<ResponseBody>) -> Result<(), Response<ResponseBody>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(resp);
        }
        *slot = Some(resp);
        Ok(())
    }

    pub fn is_sent(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn take(&self) -> Option<Response<ResponseBody>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::body;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;

    #[test]
    fn test_response_slot_is_write_once() {
        let handle = ResponseHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_sent());
        assert!(clone.send(Response::new(body::full("first"))).is_ok());
        assert!(handle.is_sent());
        assert!(handle.send(Response::new(body::full("second"))).is_err());
        assert!(handle.take().is_some());
        assert!(handle.take().is_none());
    }

    #[test]
    fn test_body_taken_once() {
        let body: RequestBody = Empty::<Bytes>::new().map_err(Into::into).boxed_unsync();
        let mut req =
            RequestHandle::new(Method::POST, Uri::from_static("/x"), HeaderMap::new(), body, 16);
        assert_eq!(req.body_limit(), 16);
        assert!(req.take_body().is_some());
        assert!(req.take_body().is_none());
    }

    #[test]
    fn test_shared_downcast() {
        let body: RequestBody = Empty::<Bytes>::new().map_err(Into::into).boxed_unsync();
        let ctx = FlowContext {
            shared: Some(Arc::new(42_u32)),
            request: RequestHandle::new(
                Method::GET,
                Uri::from_static("/"),
                HeaderMap::new(),
                body,
                0,
            ),
            response: ResponseHandle::new(),
        };
        assert_eq!(ctx.shared::<u32>(), Some(&42));
        assert!(ctx.shared::<String>().is_none());
    }
}
