//! tower 层：在出站请求上注入默认的 `grpc-timeout`
//!
//! tonic 的 `Channel` 会读取请求上的 `grpc-timeout` 并在客户端执行，
//! 同时该值会随请求发送到服务端

use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use http::HeaderValue;
use tower::{Layer, Service};
use tracing::trace;

use crate::context::{GRPC_TIMEOUT_HEADER, encode_grpc_timeout};

/// 超时豁免标记，放在请求扩展里
///
/// `Context::apply_to_request` 对豁免的上下文自动设置该标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutSkipped;

/// 超时注入层
///
/// 请求已带 `grpc-timeout`、被标记为豁免或时长为零时原样放行
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutService<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, B> Service<http::Request<B>> for TimeoutService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let skip = self.timeout.is_zero()
            || req.headers().contains_key(GRPC_TIMEOUT_HEADER)
            || req.extensions().get::<TimeoutSkipped>().is_some();

        if !skip && let Ok(value) = HeaderValue::from_str(&encode_grpc_timeout(self.timeout)) {
            trace!(timeout_ms = self.timeout.as_millis() as u64, "injecting default grpc-timeout");
            req.headers_mut().insert(GRPC_TIMEOUT_HEADER, value);
        }

        self.inner.call(req)
    }
}
