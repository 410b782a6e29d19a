//! 错误处理模块
//!
//! 拦截器本身不会改变被包装调用的错误（始终是 `tonic::Status`），
//! 这里只定义上下文结束原因与配置加载相关的错误

pub mod grpc;

pub use grpc::{code_name, status_text};

use thiserror::Error;

/// 上下文结束原因
///
/// 文本与 gRPC-Go 保持一致，会原样出现在日志的 `error` 字段里
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextError {
    /// 上下文被主动取消
    #[error("context canceled")]
    Canceled,

    /// 上下文的截止时间已过
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// 中间件错误类型
#[derive(Error, Debug)]
pub enum MiddlewareError {
    /// 配置文件读取失败
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    /// 配置内容解析失败
    #[error("配置解析失败: {0}")]
    Toml(#[from] toml::de::Error),

    /// 日志过滤规则非法
    #[error("日志过滤规则非法: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// `grpc-timeout` 元数据格式非法
    #[error("非法的 grpc-timeout 值: {0:?}")]
    InvalidTimeout(String),
}

/// 中间件结果类型
pub type Result<T> = std::result::Result<T, MiddlewareError>;
