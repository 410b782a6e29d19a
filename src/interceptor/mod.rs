//! gRPC 拦截器模块
//!
//! 定义四种调用形态（客户端/服务端 × 一元/流式）的拦截器约定，
//! 以及日志拦截器和拦截器组合
//!
//! 拦截器拿到"下一步"（调用本身或链上的下一个拦截器），在其前后附加逻辑，
//! 并原样返回下一步的结果

pub mod composite;
pub mod logging;

pub use composite::{Chain, chain};
pub use logging::{
    CallLogger, LogLevel, LoggingOptions, StreamClientLoggingInterceptor,
    StreamServerLoggingInterceptor, UnaryClientLoggingInterceptor,
    UnaryServerLoggingInterceptor,
};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures::Stream;
use tonic::Status;

use crate::context::Context;

/// 一元服务端调用信息
#[derive(Debug, Clone)]
pub struct UnaryServerInfo {
    /// 完整方法名，例如 `/pkg.Service/Method`
    pub full_method: String,
}

impl UnaryServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }
}

/// 流式服务端调用信息
#[derive(Debug, Clone)]
pub struct StreamServerInfo {
    /// 完整方法名，例如 `/pkg.Service/Method`
    pub full_method: String,
    pub is_client_stream: bool,
    pub is_server_stream: bool,
}

impl StreamServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
            is_client_stream: true,
            is_server_stream: true,
        }
    }
}

/// 一元客户端拦截器
pub trait UnaryClientInterceptor: Send + Sync {
    /// 拦截一次一元调用，`invoker` 发起真正的调用
    fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: Context,
        method: &str,
        req: Req,
        invoker: F,
    ) -> impl Future<Output = Result<Resp, Status>> + Send
    where
        Req: Send,
        Resp: Send,
        F: FnOnce(Context, Req) -> Fut + Send,
        Fut: Future<Output = Result<Resp, Status>> + Send;
}

/// 流式客户端拦截器
///
/// `streamer` 负责建立流，拦截器的作用范围到流建立完成为止
pub trait StreamClientInterceptor: Send + Sync {
    fn intercept<St, F, Fut>(
        &self,
        ctx: Context,
        method: &str,
        streamer: F,
    ) -> impl Future<Output = Result<St, Status>> + Send
    where
        St: Send,
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<St, Status>> + Send;
}

/// 一元服务端拦截器
pub trait UnaryServerInterceptor: Send + Sync {
    fn intercept<Req, Resp, H, Fut>(
        &self,
        ctx: Context,
        req: Req,
        info: &UnaryServerInfo,
        handler: H,
    ) -> impl Future<Output = Result<Resp, Status>> + Send
    where
        Req: Send,
        Resp: Send,
        H: FnOnce(Context, Req) -> Fut + Send,
        Fut: Future<Output = Result<Resp, Status>> + Send;
}

/// 流式服务端拦截器
pub trait StreamServerInterceptor: Send + Sync {
    fn intercept<S, H, Fut>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: H,
    ) -> impl Future<Output = Result<(), Status>> + Send
    where
        S: ServerStream,
        H: FnOnce(S) -> Fut + Send,
        Fut: Future<Output = Result<(), Status>> + Send;
}

/// 服务端流
///
/// 拦截器通过替换流上的上下文把派生出的上下文交给处理函数
pub trait ServerStream: Send {
    fn context(&self) -> &Context;
    fn set_context(&mut self, ctx: Context);
}

/// 为任意流附加一个可替换的上下文
///
/// 内部流实现了 `Stream` 时，包装后的流同样可以直接读取
#[derive(Debug)]
pub struct WrappedServerStream<S> {
    inner: S,
    context: Context,
}

impl<S> WrappedServerStream<S> {
    pub fn new(inner: S, context: Context) -> Self {
        Self { inner, context }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Send> ServerStream for WrappedServerStream<S> {
    fn context(&self) -> &Context {
        &self.context
    }

    fn set_context(&mut self, ctx: Context) {
        self.context = ctx;
    }
}

impl<S: Stream + Unpin> Stream for WrappedServerStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
