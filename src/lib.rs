//! Flare gRPC Middleware
//!
//! Provides composable gRPC call interceptors: structured call logging for client and
//! server (unary and streaming) calls, and default deadline injection for outbound calls.

pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod logger;
pub mod middleware;

// Re-exports
pub use config::{LoggingConfig, MiddlewareConfig, TimeoutConfig};
pub use context::{CancelFunc, Context, Field, FieldValue};
pub use error::{ContextError, MiddlewareError, Result};
pub use logger::{JsonLogger, Logger, TracingLogger};

// 拦截器 re-exports
pub use interceptor::logging::{
    new_client_logger, new_server_logger, stream_client_interceptor, stream_server_interceptor,
    unary_client_interceptor, unary_server_interceptor,
};
pub use interceptor::*;
pub use middleware::*;
