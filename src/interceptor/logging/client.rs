use std::future::Future;
use std::sync::Arc;

use tonic::Status;

use super::{CallKind, CallLogger, LoggingOptions, default_client_code_to_level};
use crate::context::Context;
use crate::interceptor::{StreamClientInterceptor, UnaryClientInterceptor};
use crate::logger::Logger;

/// 构造客户端日志策略，默认使用客户端级别映射
pub fn new_client_logger(log: impl Logger + 'static, options: LoggingOptions) -> CallLogger {
    CallLogger::new(log, default_client_code_to_level, options)
}

/// 一元客户端日志拦截器
#[derive(Clone)]
pub struct UnaryClientLoggingInterceptor {
    logger: Arc<CallLogger>,
}

/// 创建一元客户端日志拦截器，记录每一次对外的一元调用
pub fn unary_client_interceptor(
    log: impl Logger + 'static,
    options: LoggingOptions,
) -> UnaryClientLoggingInterceptor {
    UnaryClientLoggingInterceptor {
        logger: Arc::new(new_client_logger(log, options)),
    }
}

impl UnaryClientLoggingInterceptor {
    pub fn logger(&self) -> &CallLogger {
        &self.logger
    }
}

impl UnaryClientInterceptor for UnaryClientLoggingInterceptor {
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
        self.logger
            .observe(CallKind::ClientUnary, ctx, method, move |ctx| invoker(ctx, req))
    }
}

/// 流式客户端日志拦截器
///
/// 日志在流建立完成（或失败）时输出
#[derive(Clone)]
pub struct StreamClientLoggingInterceptor {
    logger: Arc<CallLogger>,
}

/// 创建流式客户端日志拦截器
pub fn stream_client_interceptor(
    log: impl Logger + 'static,
    options: LoggingOptions,
) -> StreamClientLoggingInterceptor {
    StreamClientLoggingInterceptor {
        logger: Arc::new(new_client_logger(log, options)),
    }
}

impl StreamClientLoggingInterceptor {
    pub fn logger(&self) -> &CallLogger {
        &self.logger
    }
}

impl StreamClientInterceptor for StreamClientLoggingInterceptor {
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
        self.logger
            .observe(CallKind::ClientStream, ctx, method, streamer)
    }
}
