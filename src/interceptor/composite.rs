use std::future::Future;

use tonic::Status;

use super::{
    ServerStream, StreamClientInterceptor, StreamServerInfo, StreamServerInterceptor,
    UnaryClientInterceptor, UnaryServerInfo, UnaryServerInterceptor,
};
use crate::context::Context;

/// 组合拦截器
///
/// `outer` 先执行并包住 `inner`，`inner` 再包住真正的调用。
/// 日志与超时谁在外层由使用方决定：超时在外层时日志能看到注入的截止时间
#[derive(Debug, Clone, Copy)]
pub struct Chain<O, I> {
    outer: O,
    inner: I,
}

/// 按顺序组合两个拦截器
pub fn chain<O, I>(outer: O, inner: I) -> Chain<O, I> {
    Chain { outer, inner }
}

impl<O, I> Chain<O, I> {
    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<O, I> UnaryClientInterceptor for Chain<O, I>
where
    O: UnaryClientInterceptor,
    I: UnaryClientInterceptor,
{
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
        Fut: Future<Output = Result<Resp, Status>> + Send,
    {
        let inner = &self.inner;
        self.outer.intercept(ctx, method, req, move |ctx, req| {
            inner.intercept(ctx, method, req, invoker)
        })
    }
}

impl<O, I> StreamClientInterceptor for Chain<O, I>
where
    O: StreamClientInterceptor,
    I: StreamClientInterceptor,
{
    fn intercept<St, F, Fut>(
        &self,
        ctx: Context,
        method: &str,
        streamer: F,
    ) -> impl Future<Output = Result<St, Status>> + Send
    where
        St: Send,
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<St, Status>> + Send,
    {
        let inner = &self.inner;
        self.outer
            .intercept(ctx, method, move |ctx| inner.intercept(ctx, method, streamer))
    }
}

impl<O, I> UnaryServerInterceptor for Chain<O, I>
where
    O: UnaryServerInterceptor,
    I: UnaryServerInterceptor,
{
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
        Fut: Future<Output = Result<Resp, Status>> + Send,
    {
        let inner = &self.inner;
        self.outer.intercept(ctx, req, info, move |ctx, req| {
            inner.intercept(ctx, req, info, handler)
        })
    }
}

impl<O, I> StreamServerInterceptor for Chain<O, I>
where
    O: StreamServerInterceptor,
    I: StreamServerInterceptor,
{
    fn intercept<S, H, Fut>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: H,
    ) -> impl Future<Output = Result<(), Status>> + Send
    where
        S: ServerStream,
        H: FnOnce(S) -> Fut + Send,
        Fut: Future<Output = Result<(), Status>> + Send,
    {
        let inner = &self.inner;
        self.outer
            .intercept(stream, info, move |stream| inner.intercept(stream, info, handler))
    }
}
