use std::future::Future;
use std::sync::Arc;

use tonic::Status;

use super::{CallKind, CallLogger, LoggingOptions, default_code_to_level};
use crate::interceptor::{
    ServerStream, StreamServerInfo, StreamServerInterceptor, UnaryServerInfo,
    UnaryServerInterceptor,
};
use crate::context::Context;
use crate::logger::Logger;

/// 构造服务端日志策略，默认使用服务端级别映射
pub fn new_server_logger(log: impl Logger + 'static, options: LoggingOptions) -> CallLogger {
    CallLogger::new(log, default_code_to_level, options)
}

/// 一元服务端日志拦截器
#[derive(Clone)]
pub struct UnaryServerLoggingInterceptor {
    logger: Arc<CallLogger>,
}

/// 创建一元服务端日志拦截器，处理函数收到的上下文带有调用字段
pub fn unary_server_interceptor(
    log: impl Logger + 'static,
    options: LoggingOptions,
) -> UnaryServerLoggingInterceptor {
    UnaryServerLoggingInterceptor {
        logger: Arc::new(new_server_logger(log, options)),
    }
}

impl UnaryServerLoggingInterceptor {
    pub fn logger(&self) -> &CallLogger {
        &self.logger
    }
}

impl UnaryServerInterceptor for UnaryServerLoggingInterceptor {
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
        self.logger.observe(
            CallKind::ServerUnary,
            ctx,
            &info.full_method,
            move |ctx| handler(ctx, req),
        )
    }
}

/// 流式服务端日志拦截器
#[derive(Clone)]
pub struct StreamServerLoggingInterceptor {
    logger: Arc<CallLogger>,
}

/// 创建流式服务端日志拦截器，处理函数收到的流带有调用字段
pub fn stream_server_interceptor(
    log: impl Logger + 'static,
    options: LoggingOptions,
) -> StreamServerLoggingInterceptor {
    StreamServerLoggingInterceptor {
        logger: Arc::new(new_server_logger(log, options)),
    }
}

impl StreamServerLoggingInterceptor {
    pub fn logger(&self) -> &CallLogger {
        &self.logger
    }
}

impl StreamServerInterceptor for StreamServerLoggingInterceptor {
    fn intercept<S, H, Fut>(
        &self,
        mut stream: S,
        info: &StreamServerInfo,
        handler: H,
    ) -> impl Future<Output = Result<(), Status>> + Send
    where
        S: ServerStream,
        H: FnOnce(S) -> Fut + Send,
        Fut: Future<Output = Result<(), Status>> + Send,
    {
        let ctx = stream.context().clone();

        self.logger.observe(
            CallKind::ServerStream,
            ctx,
            &info.full_method,
            move |ctx| {
                stream.set_context(ctx);
                handler(stream)
            },
        )
    }
}
