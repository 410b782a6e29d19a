//! `grpc-timeout` 元数据传播
//!
//! 服务端从请求元数据恢复截止时间，客户端把上下文剩余时间写回请求，
//! 使注入的截止时间能到达对端

use std::time::Duration;

use tonic::Request;
use tonic::metadata::MetadataMap;
use tracing::debug;

use super::{CancelFunc, Context};
use crate::error::{MiddlewareError, Result};
use crate::middleware::timeout::TimeoutSkipped;

/// 标准的超时元数据键
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

// 协议规定数值部分最多 8 位
const MAX_TIMEOUT_VALUE: u128 = 99_999_999;

/// 按协议格式编码超时时长，选用能容纳数值的最小单位
pub fn encode_grpc_timeout(timeout: Duration) -> String {
    let nanos = timeout.as_nanos();

    if nanos <= MAX_TIMEOUT_VALUE {
        format!("{nanos}n")
    } else if nanos / 1_000 <= MAX_TIMEOUT_VALUE {
        format!("{}u", nanos / 1_000)
    } else if nanos / 1_000_000 <= MAX_TIMEOUT_VALUE {
        format!("{}m", nanos / 1_000_000)
    } else if timeout.as_secs() as u128 <= MAX_TIMEOUT_VALUE {
        format!("{}S", timeout.as_secs())
    } else if (timeout.as_secs() / 60) as u128 <= MAX_TIMEOUT_VALUE {
        format!("{}M", timeout.as_secs() / 60)
    } else {
        format!("{}H", (timeout.as_secs() / 3600).min(MAX_TIMEOUT_VALUE as u64))
    }
}

/// 解析 `grpc-timeout` 值，例如 `20m`、`1S`、`3H`
pub fn decode_grpc_timeout(value: &str) -> Result<Duration> {
    let invalid = || MiddlewareError::InvalidTimeout(value.to_string());

    let unit = value.chars().last().ok_or_else(invalid)?;
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let timeout = match unit {
        'H' => Duration::from_secs(amount * 3600),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return Err(invalid()),
    };

    Ok(timeout)
}

impl Context {
    /// 从请求元数据构建服务端上下文
    ///
    /// 元数据缺失或格式非法时返回不带截止时间的根上下文
    pub fn from_metadata(metadata: &MetadataMap) -> (Self, CancelFunc) {
        let root = Self::background();

        let Some(value) = metadata.get(GRPC_TIMEOUT_HEADER) else {
            return (root, CancelFunc::noop());
        };

        let timeout = value
            .to_str()
            .map_err(|_| MiddlewareError::InvalidTimeout(format!("{value:?}")))
            .and_then(decode_grpc_timeout);

        match timeout {
            Ok(timeout) => root.with_timeout(timeout),
            Err(err) => {
                debug!(error = %err, "ignoring malformed grpc-timeout");
                (root, CancelFunc::noop())
            }
        }
    }

    /// 从 tonic 请求构建服务端上下文
    pub fn from_request<T>(request: &Request<T>) -> (Self, CancelFunc) {
        Self::from_metadata(request.metadata())
    }

    /// 把剩余时间写入请求的超时元数据
    ///
    /// 超时豁免的上下文会在请求扩展里留下 `TimeoutSkipped`，`TimeoutLayer` 据此放行
    pub fn apply_to_request<T>(&self, request: &mut Request<T>) {
        if let Some(remaining) = self.remaining() {
            request.set_timeout(remaining);
        }

        if self.is_timeout_skipped() {
            request.extensions_mut().insert(TimeoutSkipped);
        }
    }
}
