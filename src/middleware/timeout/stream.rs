use std::future::Future;
use std::time::Duration;

use tonic::Status;

use super::with_timeout;
use crate::context::Context;
use crate::interceptor::StreamClientInterceptor;

/// 流式客户端超时拦截器
///
/// 截止时间只约束流的建立，流建立完成后释放
#[derive(Debug, Clone, Copy)]
pub struct StreamClientTimeoutInterceptor {
    duration: Duration,
}

pub fn stream_client_timeout_interceptor(duration: Duration) -> StreamClientTimeoutInterceptor {
    StreamClientTimeoutInterceptor { duration }
}

impl StreamClientTimeoutInterceptor {
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl StreamClientInterceptor for StreamClientTimeoutInterceptor {
    fn intercept<St, F, Fut>(
        &self,
        ctx: Context,
        _method: &str,
        streamer: F,
    ) -> impl Future<Output = Result<St, Status>> + Send
    where
        St: Send,
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<St, Status>> + Send,
    {
        let duration = self.duration;

        async move {
            let (ctx, _release) = with_timeout(ctx, duration);
            streamer(ctx).await
        }
    }
}

/// 流式客户端延迟拦截器，仅用于测试超时行为
#[derive(Debug, Clone, Copy)]
pub struct StreamClientSleepInterceptor {
    duration: Duration,
}

pub fn stream_client_sleep_interceptor(duration: Duration) -> StreamClientSleepInterceptor {
    StreamClientSleepInterceptor { duration }
}

impl StreamClientInterceptor for StreamClientSleepInterceptor {
    fn intercept<St, F, Fut>(
        &self,
        ctx: Context,
        _method: &str,
        streamer: F,
    ) -> impl Future<Output = Result<St, Status>> + Send
    where
        St: Send,
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<St, Status>> + Send,
    {
        let duration = self.duration;

        async move {
            tokio::time::sleep(duration).await;
            streamer(ctx).await
        }
    }
}
