//! gRPC 中间件模块
//!
//! 提供客户端超时注入（拦截器与 tower 层）

pub mod timeout;

pub use timeout::{
    StreamClientSleepInterceptor, StreamClientTimeoutInterceptor, TimeoutLayer, TimeoutService,
    TimeoutSkipped, UnaryClientSleepInterceptor, UnaryClientTimeoutInterceptor,
    is_timeout_skipped, skip_timeout,
    stream_client_sleep_interceptor, stream_client_timeout_interceptor,
    unary_client_sleep_interceptor, unary_client_timeout_interceptor, with_timeout,
};
