//! 调用上下文模块
//!
//! `Context` 是一次调用的不可变上下文：携带日志字段、可选的截止时间、
//! 超时豁免标记以及取消信号。派生出的子上下文继承父上下文的全部内容，
//! 父上下文被取消时子上下文一并结束，反之不成立。

pub mod metadata;

pub use metadata::{GRPC_TIMEOUT_HEADER, decode_grpc_timeout, encode_grpc_timeout};

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Status};

use crate::error::{ContextError, code_name};

/// 日志字段值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Time(DateTime<Utc>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::I64(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::U64(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::F32(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Time(value)
    }
}

impl From<Code> for FieldValue {
    fn from(code: Code) -> Self {
        FieldValue::Str(code_name(code).to_string())
    }
}

/// 日志字段
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    wall: DateTime<Utc>,
}

/// 取消作用域
///
/// 每次 `with_cancel` / `with_deadline` 派生一个新的作用域。结束原因只记录一次，
/// 记录后不再改变
#[derive(Debug)]
struct Scope {
    token: CancellationToken,
    deadline: Option<Deadline>,
    parent: Option<Arc<Scope>>,
    cause: OnceLock<(ContextError, Instant)>,
}

impl Scope {
    fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            parent: None,
            cause: OnceLock::new(),
        }
    }

    fn child(parent: &Arc<Scope>, deadline: Option<Deadline>) -> Self {
        Self {
            token: parent.token.child_token(),
            deadline,
            parent: Some(parent.clone()),
            cause: OnceLock::new(),
        }
    }

    /// 结束原因及其发生时刻
    ///
    /// 祖先被取消时，以本作用域截止时间与祖先结束时刻中更早的一个为准
    fn cause(&self) -> Option<(ContextError, Instant)> {
        if let Some(cause) = self.cause.get() {
            return Some(*cause);
        }

        if self.token.is_cancelled()
            && let Some((err, at)) = self.parent.as_ref().and_then(|parent| parent.cause())
        {
            let cause = match self.deadline {
                Some(deadline) if deadline.at <= at => {
                    (ContextError::DeadlineExceeded, deadline.at)
                }
                _ => (err, at),
            };
            return Some(*self.cause.get_or_init(|| cause));
        }

        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline.at
        {
            return Some(
                *self
                    .cause
                    .get_or_init(|| (ContextError::DeadlineExceeded, deadline.at)),
            );
        }

        None
    }

    fn cancel(&self) {
        if self.cause().is_none() {
            let now = Instant::now();
            self.cause.get_or_init(|| (ContextError::Canceled, now));
        }
        self.token.cancel();
    }
}

/// 调用上下文
///
/// 克隆代价很低（字段列表与取消作用域共享），所有派生操作都返回新的上下文
#[derive(Clone)]
pub struct Context {
    fields: Arc<Vec<Field>>,
    timeout_skipped: bool,
    scope: Arc<Scope>,
}

impl Context {
    /// 根上下文：没有字段、没有截止时间、永远不会被取消
    pub fn background() -> Self {
        Self {
            fields: Arc::new(Vec::new()),
            timeout_skipped: false,
            scope: Arc::new(Scope::root()),
        }
    }

    // ============================================================
    // 字段
    // ============================================================

    /// 按添加顺序返回全部字段
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// 查找字段，同名字段以最后添加的为准
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    /// 派生一个追加了字段的上下文
    ///
    /// 派生的上下文与当前上下文共享取消信号和截止时间
    pub fn with_fields<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, FieldValue)>,
    {
        let mut merged = Vec::clone(&self.fields);
        merged.extend(fields.into_iter().map(|(key, value)| Field { key, value }));

        Self {
            fields: Arc::new(merged),
            ..self.clone()
        }
    }

    /// 派生一个追加了单个字段的上下文
    pub fn with_field(&self, key: &'static str, value: impl Into<FieldValue>) -> Self {
        self.with_fields([(key, value.into())])
    }

    // ============================================================
    // 截止时间与取消
    // ============================================================

    /// 截止时间
    pub fn deadline(&self) -> Option<Instant> {
        self.scope.deadline.map(|d| d.at)
    }

    /// 截止时间对应的墙上时间，用于日志
    pub fn deadline_time(&self) -> Option<DateTime<Utc>> {
        self.scope.deadline.map(|d| d.wall)
    }

    /// 距离截止时间的剩余时长，已过期时为零
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// 派生一个可取消的子上下文
    pub fn with_cancel(&self) -> (Self, CancelFunc) {
        self.derive(self.scope.deadline)
    }

    /// 派生一个带截止时间的子上下文
    ///
    /// 父上下文的截止时间更早时保留父上下文的截止时间
    pub fn with_deadline(&self, at: Instant) -> (Self, CancelFunc) {
        let deadline = match self.scope.deadline {
            Some(existing) if existing.at <= at => existing,
            _ => Deadline {
                at,
                wall: wall_clock(at),
            },
        };

        self.derive(Some(deadline))
    }

    /// 派生一个在 `timeout` 之后到期的子上下文
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelFunc) {
        match Instant::now().checked_add(timeout) {
            Some(at) => self.with_deadline(at),
            // 超出时钟范围，等同于没有截止时间
            None => self.with_cancel(),
        }
    }

    fn derive(&self, deadline: Option<Deadline>) -> (Self, CancelFunc) {
        let scope = Arc::new(Scope::child(&self.scope, deadline));
        let ctx = Self {
            scope: scope.clone(),
            ..self.clone()
        };

        (ctx, CancelFunc::new(scope))
    }

    /// 派生一个超时豁免的上下文
    ///
    /// 标记不可撤销，所有后代上下文都会继承
    pub fn skip_timeout(&self) -> Self {
        Self {
            timeout_skipped: true,
            ..self.clone()
        }
    }

    /// 是否被标记为超时豁免
    pub fn is_timeout_skipped(&self) -> bool {
        self.timeout_skipped
    }

    /// 上下文结束的原因，尚未结束时返回 `None`
    ///
    /// 第一次结束的原因会被记录下来，之后不再改变
    pub fn err(&self) -> Option<ContextError> {
        self.scope.cause().map(|(err, _)| err)
    }

    /// 上下文是否已经结束
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// 等待上下文结束（被取消或到期）
    pub async fn done(&self) -> ContextError {
        match self.scope.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.scope.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline.at) => {}
                }
                self.err().unwrap_or(ContextError::DeadlineExceeded)
            }
            None => {
                self.scope.token.cancelled().await;
                self.err().unwrap_or(ContextError::Canceled)
            }
        }
    }

    /// 在上下文的约束下执行一次调用
    ///
    /// 上下文先结束时返回 `DeadlineExceeded` / `Cancelled` 状态，
    /// 传输层用它把截止时间落实到真正的调用上
    pub async fn run<T, F>(&self, call: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, Status>>,
    {
        if let Some(err) = self.err() {
            return Err(err.into());
        }

        tokio::select! {
            biased;
            result = call => result,
            err = self.done() => Err(err.into()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("fields", &self.fields)
            .field("deadline", &self.deadline_time())
            .field("timeout_skipped", &self.timeout_skipped)
            .field("err", &self.err())
            .finish()
    }
}

fn wall_clock(at: Instant) -> DateTime<Utc> {
    let now = Utc::now();
    TimeDelta::from_std(at.saturating_duration_since(Instant::now()))
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 释放函数
///
/// 取消由 `with_cancel` / `with_deadline` / `with_timeout` 派生出的子上下文，
/// 父上下文不受影响。可重复调用；被丢弃时自动执行一次。
#[must_use = "dropping a CancelFunc cancels its context immediately"]
#[derive(Debug)]
pub struct CancelFunc {
    scope: Option<Arc<Scope>>,
}

impl CancelFunc {
    fn new(scope: Arc<Scope>) -> Self {
        Self { scope: Some(scope) }
    }

    /// 空释放函数，调用没有任何效果
    pub fn noop() -> Self {
        Self { scope: None }
    }

    /// 取消对应的上下文
    ///
    /// 截止时间已过时上下文的结束原因仍是 `DeadlineExceeded`
    pub fn cancel(&self) {
        if let Some(scope) = &self.scope {
            scope.cancel();
        }
    }

    /// 是否为空释放函数
    pub fn is_noop(&self) -> bool {
        self.scope.is_none()
    }
}

impl Drop for CancelFunc {
    fn drop(&mut self) {
        self.cancel();
    }
}
