//! 日志级别与默认的状态码映射表

use std::fmt;

use serde::{Deserialize, Serialize};
use tonic::Code;

/// 日志级别，数值越大越重要
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(i8)]
pub enum LogLevel {
    /// 调试日志，量大，生产环境通常关闭
    Debug = -1,
    /// 默认级别
    #[default]
    Info = 0,
    /// 与 Info 同级，但任何情况下都不会被丢弃
    Important = 1,
    /// 比 Info 重要，但不需要逐条人工处理
    Warn = 2,
    /// 高优先级，正常运行的服务不应产生 Error 日志
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Important => "important",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务端默认的状态码到日志级别映射
pub fn default_code_to_level(code: Code) -> LogLevel {
    match code {
        Code::Ok => LogLevel::Info,
        Code::Cancelled => LogLevel::Info,
        Code::Unknown => LogLevel::Error,
        Code::InvalidArgument => LogLevel::Info,
        Code::DeadlineExceeded => LogLevel::Warn,
        Code::NotFound => LogLevel::Info,
        Code::AlreadyExists => LogLevel::Info,
        Code::PermissionDenied => LogLevel::Warn,
        // 未认证的请求属于正常现象
        Code::Unauthenticated => LogLevel::Info,
        Code::ResourceExhausted => LogLevel::Warn,
        Code::FailedPrecondition => LogLevel::Warn,
        Code::Aborted => LogLevel::Warn,
        Code::OutOfRange => LogLevel::Warn,
        Code::Unimplemented => LogLevel::Error,
        Code::Internal => LogLevel::Error,
        Code::Unavailable => LogLevel::Warn,
        Code::DataLoss => LogLevel::Error,
    }
}

/// 客户端默认的状态码到日志级别映射
///
/// 比服务端整体低一档，严重失败由服务端负责大声报告
pub fn default_client_code_to_level(code: Code) -> LogLevel {
    match code {
        Code::Ok => LogLevel::Debug,
        Code::Cancelled => LogLevel::Debug,
        Code::Unknown => LogLevel::Info,
        Code::InvalidArgument => LogLevel::Debug,
        Code::DeadlineExceeded => LogLevel::Info,
        Code::NotFound => LogLevel::Debug,
        Code::AlreadyExists => LogLevel::Debug,
        Code::PermissionDenied => LogLevel::Info,
        Code::Unauthenticated => LogLevel::Info,
        Code::ResourceExhausted => LogLevel::Debug,
        Code::FailedPrecondition => LogLevel::Debug,
        Code::Aborted => LogLevel::Debug,
        Code::OutOfRange => LogLevel::Debug,
        Code::Unimplemented => LogLevel::Warn,
        Code::Internal => LogLevel::Warn,
        Code::Unavailable => LogLevel::Warn,
        Code::DataLoss => LogLevel::Warn,
    }
}
