//! 客户端超时注入
//!
//! 出站调用没有截止时间时注入一个默认截止时间。已有截止时间、
//! 被标记为超时豁免或配置时长为零的调用原样放行
//!
//! 拦截器作用于 `Context`；`TimeoutLayer` 作用于 tonic `Channel` 的 tower 栈

mod layer;
mod stream;
mod unary;

pub use layer::{TimeoutLayer, TimeoutService, TimeoutSkipped};
pub use stream::{
    StreamClientSleepInterceptor, StreamClientTimeoutInterceptor, stream_client_sleep_interceptor,
    stream_client_timeout_interceptor,
};
pub use unary::{
    UnaryClientSleepInterceptor, UnaryClientTimeoutInterceptor, unary_client_sleep_interceptor,
    unary_client_timeout_interceptor,
};

use std::time::Duration;

use tracing::trace;

use crate::context::{CancelFunc, Context};

/// 为上下文注入截止时间
///
/// 不需要注入时返回原上下文和一个空释放函数。
/// 注入时返回的释放函数只取消派生出的子上下文
pub fn with_timeout(ctx: Context, timeout: Duration) -> (Context, CancelFunc) {
    if timeout.is_zero() || ctx.deadline().is_some() || ctx.is_timeout_skipped() {
        return (ctx, CancelFunc::noop());
    }

    trace!(timeout_ms = timeout.as_millis() as u64, "injecting default deadline");
    ctx.with_timeout(timeout)
}

/// 把上下文标记为超时豁免，后代上下文一并豁免
pub fn skip_timeout(ctx: &Context) -> Context {
    ctx.skip_timeout()
}

pub fn is_timeout_skipped(ctx: &Context) -> bool {
    ctx.is_timeout_skipped()
}
