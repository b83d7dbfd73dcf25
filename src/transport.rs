//! Transport boundary (§6): the dispatch core never assumes a concrete socket layer.
//! Grounded in the teacher's `may_minihttp`-backed `AppService`, but decoupled behind a
//! trait so the core can be driven end-to-end by an in-process implementation in tests
//! without binding a port.

use async_trait::async_trait;

use crate::context::RawRequest;
use crate::executor::HttpResponse;

/// Something that can hand a [`RawRequest`] to the core and receive an
/// [`HttpResponse`] back. A concrete socket-backed transport (e.g. hyper, `may_minihttp`)
/// implements this by parsing bytes off the wire into `RawRequest` and serialising the
/// response back out; the in-process transport below skips the wire entirely.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: RawRequest) -> HttpResponse;
}

/// Drives the dispatch core directly in-process, with no socket — sufficient to
/// exercise the end-to-end scenarios in §8 without a concrete server dependency.
pub struct InProcessTransport<F> {
    handler: F,
}

impl<F> InProcessTransport<F>
where
    F: Fn(RawRequest) -> std::pin::Pin<Box<dyn std::future::Future<Output = HttpResponse> + Send>>
        + Send
        + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Transport for InProcessTransport<F>
where
    F: Fn(RawRequest) -> std::pin::Pin<Box<dyn std::future::Future<Output = HttpResponse> + Send>>
        + Send
        + Sync,
{
    async fn dispatch(&self, request: RawRequest) -> HttpResponse {
        (self.handler)(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn in_process_transport_invokes_the_handler() {
        let transport = InProcessTransport::new(|_req: RawRequest| {
            Box::pin(async { HttpResponse { status: 200, headers: Vec::new(), body: b"ok".to_vec() } })
                as std::pin::Pin<Box<dyn std::future::Future<Output = HttpResponse> + Send>>
        });
        let response = transport
            .dispatch(RawRequest { method: Method::GET, url: "/x".to_string(), headers: Vec::new(), body: Vec::new() })
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"ok");
    }
}
