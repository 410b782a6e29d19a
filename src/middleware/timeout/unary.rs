use std::future::Future;
use std::time::Duration;

use tonic::Status;

use super::with_timeout;
use crate::context::Context;
use crate::interceptor::UnaryClientInterceptor;

/// 一元客户端超时拦截器
#[derive(Debug, Clone, Copy)]
pub struct UnaryClientTimeoutInterceptor {
    duration: Duration,
}

/// 创建一元客户端超时拦截器，时长为零时不注入任何截止时间
pub fn unary_client_timeout_interceptor(duration: Duration) -> UnaryClientTimeoutInterceptor {
    UnaryClientTimeoutInterceptor { duration }
}

impl UnaryClientTimeoutInterceptor {
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl UnaryClientInterceptor for UnaryClientTimeoutInterceptor {
    fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: Context,
        _method: &str,
        req: Req,
        invoker: F,
    ) -> impl Future<Output = Result<Resp, Status>> + Send
    where
        Req: Send,
        Resp: Send,
        F: FnOnce(Context, Req) -> Fut + Send,
        Fut: Future<Output = Result<Resp, Status>> + Send,
    {
        let duration = self.duration;

        async move {
            // 调用结束或 future 被丢弃时释放
            let (ctx, _release) = with_timeout(ctx, duration);
            invoker(ctx, req).await
        }
    }
}

/// 一元客户端延迟拦截器，仅用于测试超时行为
#[derive(Debug, Clone, Copy)]
pub struct UnaryClientSleepInterceptor {
    duration: Duration,
}

/// 创建一元客户端延迟拦截器：先等待 `duration` 再发起调用
pub fn unary_client_sleep_interceptor(duration: Duration) -> UnaryClientSleepInterceptor {
    UnaryClientSleepInterceptor { duration }
}

impl UnaryClientInterceptor for UnaryClientSleepInterceptor {
    fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: Context,
        _method: &str,
        req: Req,
        invoker: F,
    ) -> impl Future<Output = Result<Resp, Status>> + Send
    where
        Req: Send,
        Resp: Send,
        F: FnOnce(Context, Req) -> Fut + Send,
        Fut: Future<Output = Result<Resp, Status>> + Send,
    {
        let duration = self.duration;

        async move {
            tokio::time::sleep(duration).await;
            invoker(ctx, req).await
        }
    }
}
