use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use super::{Logger, fields_to_json};
use crate::context::Context;
use crate::error::Result;

/// `Important` 记录使用的 target
pub const IMPORTANT_TARGET: &str = "important";

/// 基于 `tracing` 的日志输出
///
/// 上下文字段以 JSON 字符串的形式放在 `fields` 字段中：`tracing` 的字段名必须在编译期确定，
/// 而上下文字段的键是运行时追加的。下游需要结构化字段时解析 `fields` 即可。
///
/// `Important` 以 INFO 级别、`IMPORTANT_TARGET` 输出，并带上 `important = true`。
/// 订阅者需要用 [`important_filter`] 构造过滤器，否则会按普通 INFO 日志过滤
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

/// 在给定的过滤规则上始终放行 `Important` 记录
///
/// 例如 `important_filter("warn")` 只输出 WARN 及以上，外加全部 `Important` 记录
pub fn important_filter(directives: &str) -> Result<EnvFilter> {
    let filter = EnvFilter::try_new(directives)?
        .add_directive(format!("{IMPORTANT_TARGET}=trace").parse()?);
    Ok(filter)
}

fn render(ctx: &Context) -> String {
    let mut map = Map::new();
    fields_to_json(ctx, &mut map);
    Value::Object(map).to_string()
}

impl Logger for TracingLogger {
    fn debug(&self, ctx: &Context, msg: &str) {
        debug!(fields = %render(ctx), "{}", msg);
    }

    fn info(&self, ctx: &Context, msg: &str) {
        info!(fields = %render(ctx), "{}", msg);
    }

    fn important(&self, ctx: &Context, msg: &str) {
        info!(target: IMPORTANT_TARGET, important = true, fields = %render(ctx), "{}", msg);
    }

    fn warn(&self, ctx: &Context, msg: &str) {
        warn!(fields = %render(ctx), "{}", msg);
    }

    fn error(&self, ctx: &Context, msg: &str) {
        error!(fields = %render(ctx), "{}", msg);
    }
}
