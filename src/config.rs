use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interceptor::logging::LogLevel;
use crate::logger::JsonLogger;
use crate::middleware::timeout::{
    StreamClientTimeoutInterceptor, TimeoutLayer, UnaryClientTimeoutInterceptor,
    stream_client_timeout_interceptor, unary_client_timeout_interceptor,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MiddlewareConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timeout: TimeoutConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 最低输出级别：debug, info, important, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// 默认超时（毫秒），0 表示不注入
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

impl MiddlewareConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MiddlewareConfig = toml::from_str(content)?;
        Ok(config)
    }
}

impl LoggingConfig {
    /// 按配置的最低级别构造 JSON 行日志
    pub fn json_logger<W: Write + Send>(&self, writer: W) -> JsonLogger<W> {
        JsonLogger::new(writer, self.level)
    }
}

impl TimeoutConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn unary_interceptor(&self) -> UnaryClientTimeoutInterceptor {
        unary_client_timeout_interceptor(self.duration())
    }

    pub fn stream_interceptor(&self) -> StreamClientTimeoutInterceptor {
        stream_client_timeout_interceptor(self.duration())
    }

    /// 用于 tonic `Channel` 的 tower 层
    pub fn layer(&self) -> TimeoutLayer {
        TimeoutLayer::new(self.duration())
    }
}
