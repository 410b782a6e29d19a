use std::io::Write;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::{Logger, fields_to_json};
use crate::context::Context;
use crate::interceptor::logging::LogLevel;

/// JSON 行日志
///
/// 每条记录输出一行：`level`、`time`、`msg`，随后是上下文中的全部字段。
/// 低于最低级别的记录会被丢弃，`Important` 例外，并以 `info` 输出。
/// 写入失败直接丢弃。
pub struct JsonLogger<W> {
    writer: Mutex<W>,
    level: LogLevel,
}

impl<W: Write + Send> JsonLogger<W> {
    pub fn new(writer: W, level: LogLevel) -> Self {
        Self {
            writer: Mutex::new(writer),
            level,
        }
    }

    /// 最低输出级别
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level == LogLevel::Important || level >= self.level
    }

    fn emit(&self, level: LogLevel, ctx: &Context, msg: &str) {
        if !self.enabled(level) {
            return;
        }

        let level_name = match level {
            LogLevel::Important => LogLevel::Info.as_str(),
            other => other.as_str(),
        };

        let mut record = Map::new();
        record.insert("level".to_string(), Value::from(level_name));
        record.insert(
            "time".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        record.insert("msg".to_string(), Value::from(msg));
        fields_to_json(ctx, &mut record);

        let Ok(mut writer) = self.writer.lock() else {
            return;
        };

        if serde_json::to_writer(&mut *writer, &Value::Object(record)).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

impl<W: Write + Send> Logger for JsonLogger<W> {
    fn debug(&self, ctx: &Context, msg: &str) {
        self.emit(LogLevel::Debug, ctx, msg);
    }

    fn info(&self, ctx: &Context, msg: &str) {
        self.emit(LogLevel::Info, ctx, msg);
    }

    fn important(&self, ctx: &Context, msg: &str) {
        self.emit(LogLevel::Important, ctx, msg);
    }

    fn warn(&self, ctx: &Context, msg: &str) {
        self.emit(LogLevel::Warn, ctx, msg);
    }

    fn error(&self, ctx: &Context, msg: &str) {
        self.emit(LogLevel::Error, ctx, msg);
    }
}
