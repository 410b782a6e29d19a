//! 日志输出模块
//!
//! 拦截器只依赖 `Logger` trait，具体写到哪里由使用方决定

mod json;
mod tracing_logger;

pub use json::JsonLogger;
pub use tracing_logger::{IMPORTANT_TARGET, TracingLogger, important_filter};

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::Context;

/// 结构化日志输出
///
/// 字段取自 `Context`，实现必须是线程安全的，且不能因为写入失败而 panic
pub trait Logger: Send + Sync {
    fn debug(&self, ctx: &Context, msg: &str);
    fn info(&self, ctx: &Context, msg: &str);
    /// 与 `info` 同级，但不能被最低级别过滤掉
    fn important(&self, ctx: &Context, msg: &str);
    fn warn(&self, ctx: &Context, msg: &str);
    fn error(&self, ctx: &Context, msg: &str);
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn debug(&self, ctx: &Context, msg: &str) {
        (**self).debug(ctx, msg)
    }

    fn info(&self, ctx: &Context, msg: &str) {
        (**self).info(ctx, msg)
    }

    fn important(&self, ctx: &Context, msg: &str) {
        (**self).important(ctx, msg)
    }

    fn warn(&self, ctx: &Context, msg: &str) {
        (**self).warn(ctx, msg)
    }

    fn error(&self, ctx: &Context, msg: &str) {
        (**self).error(ctx, msg)
    }
}

/// 把上下文字段展开为 JSON 对象，同名字段以最后添加的为准
pub(crate) fn fields_to_json(ctx: &Context, map: &mut Map<String, Value>) {
    for field in ctx.fields() {
        let value = serde_json::to_value(&field.value).unwrap_or(Value::Null);
        map.insert(field.key.to_string(), value);
    }
}
