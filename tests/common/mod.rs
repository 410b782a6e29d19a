//! 测试辅助工具
#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use flare_grpc_middleware::{JsonLogger, LogLevel};
use serde_json::Value;

/// 值为该占位符的字段只检查存在，不比较内容
pub const IGNORE_DIFF: &str = "<ignore-diff>";

/// 可共享的内存写入端
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn json_logger(level: LogLevel) -> (Arc<JsonLogger<Buffer>>, Buffer) {
    let buf = Buffer::default();
    (Arc::new(JsonLogger::new(buf.clone(), level)), buf)
}

/// 比较一条 JSON 日志，`expected` 为空时要求没有任何输出
pub fn assert_log_message(expected: &str, actual: &str) {
    if expected.is_empty() {
        assert_eq!(actual, "", "expected no log output");
        return;
    }

    let lines: Vec<&str> = actual.lines().collect();
    assert_eq!(lines.len(), 1, "expected exactly one record, got {actual:?}");

    let expected: Value = serde_json::from_str(expected).unwrap();
    let mut actual: Value = serde_json::from_str(lines[0]).unwrap();

    let expected_map = expected.as_object().unwrap();
    let actual_map = actual.as_object_mut().unwrap();

    for (key, value) in expected_map {
        if value.as_str() == Some(IGNORE_DIFF) {
            assert!(actual_map.contains_key(key), "missing field {key}");
            actual_map.insert(key.clone(), value.clone());
        }
    }

    assert_eq!(&expected, &actual);
}
