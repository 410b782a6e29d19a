//! 调用日志拦截器
//!
//! 每次调用结束后输出一条结构化日志，包含服务名、方法名、开始时间、
//! 截止时间、状态码和耗时。日志级别由状态码决定，所有策略都可以替换：
//!
//! - decider：是否输出日志（仅服务端使用，客户端调用始终输出）
//! - codes：错误到状态码的映射
//! - levels：状态码到日志级别的映射
//! - message producer：最终的日志消息与附加字段

pub mod client;
pub mod level;
pub mod server;

pub use client::{
    StreamClientLoggingInterceptor, UnaryClientLoggingInterceptor, new_client_logger,
    stream_client_interceptor, unary_client_interceptor,
};
pub use level::{LogLevel, default_client_code_to_level, default_code_to_level};
pub use server::{
    StreamServerLoggingInterceptor, UnaryServerLoggingInterceptor, new_server_logger,
    stream_server_interceptor, unary_server_interceptor,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tonic::{Code, Status};

use crate::context::Context;
use crate::error::status_text;
use crate::logger::Logger;

/// 日志字段：系统
pub const FIELD_SYSTEM: &str = "system";
/// 日志字段：调用方向
pub const FIELD_KIND: &str = "span.kind";
/// 日志字段：服务名
pub const FIELD_SERVICE: &str = "grpc.service";
/// 日志字段：方法名
pub const FIELD_METHOD: &str = "grpc.method";
/// 日志字段：开始时间
pub const FIELD_START_TIME: &str = "grpc.start_time";
/// 日志字段：请求截止时间
pub const FIELD_DEADLINE: &str = "grpc.request.deadline";
/// 日志字段：耗时（毫秒）
pub const FIELD_DURATION: &str = "grpc.duration_ms";
/// 日志字段：状态码
pub const FIELD_CODE: &str = "grpc.code";
/// 日志字段：错误
pub const FIELD_ERROR: &str = "error";

/// 是否输出日志，参数为完整方法名和错误
pub type Decider = Arc<dyn Fn(&str, Option<&Status>) -> bool + Send + Sync>;

/// 错误到状态码的映射
pub type ErrorToCode = Arc<dyn Fn(Option<&Status>) -> Code + Send + Sync>;

/// 状态码到日志级别的映射
pub type CodeToLevel = Arc<dyn Fn(Code) -> LogLevel + Send + Sync>;

/// 生成最终的日志消息，可以继续向上下文追加字段
pub type MessageProducer =
    Arc<dyn Fn(Context, &str, Code, Option<&Status>, Duration) -> (Context, String) + Send + Sync>;

/// 默认 decider：全部输出
pub fn default_decider(_full_method: &str, _err: Option<&Status>) -> bool {
    true
}

/// 默认错误映射：没有错误为 `OK`，否则取状态本身的状态码
pub fn default_error_to_code(err: Option<&Status>) -> Code {
    err.map_or(Code::Ok, Status::code)
}

/// 耗时转换为毫秒：先截断到微秒再除以 1000
pub fn duration_in_milliseconds(duration: Duration) -> f32 {
    (duration.as_nanos() / 1_000) as f32 / 1_000.0
}

/// 默认消息生成：追加状态码、耗时，有错误时追加错误文本
pub fn default_message_producer(
    ctx: Context,
    msg: &str,
    code: Code,
    err: Option<&Status>,
    duration: Duration,
) -> (Context, String) {
    let mut ctx = ctx.with_fields([
        (FIELD_CODE, code.into()),
        (FIELD_DURATION, duration_in_milliseconds(duration).into()),
    ]);

    if let Some(err) = err {
        ctx = ctx.with_field(FIELD_ERROR, status_text(err));
    }

    (ctx, msg.to_string())
}

/// 把完整方法名拆成服务名和方法名
///
/// `/pkg.Service/Method` 拆为 `pkg.Service` 和 `Method`
pub fn split_method(full_method: &str) -> (&str, &str) {
    match full_method.rfind('/') {
        Some(idx) => {
            let service = &full_method[..idx];
            let service = service.strip_prefix('/').unwrap_or(service);
            (service, &full_method[idx + 1..])
        }
        None => ("", full_method),
    }
}

/// 日志配置项
///
/// 未设置的项使用默认策略；状态码到级别的默认映射按客户端/服务端区分
#[derive(Clone, Default)]
pub struct LoggingOptions {
    should_log: Option<Decider>,
    error_to_code: Option<ErrorToCode>,
    code_to_level: Option<CodeToLevel>,
    produce_message: Option<MessageProducer>,
}

impl LoggingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置是否输出日志的判断（仅服务端生效）
    pub fn with_decider<F>(mut self, decider: F) -> Self
    where
        F: Fn(&str, Option<&Status>) -> bool + Send + Sync + 'static,
    {
        self.should_log = Some(Arc::new(decider));
        self
    }

    /// 设置状态码到日志级别的映射
    pub fn with_levels<F>(mut self, levels: F) -> Self
    where
        F: Fn(Code) -> LogLevel + Send + Sync + 'static,
    {
        self.code_to_level = Some(Arc::new(levels));
        self
    }

    /// 设置错误到状态码的映射
    pub fn with_codes<F>(mut self, codes: F) -> Self
    where
        F: Fn(Option<&Status>) -> Code + Send + Sync + 'static,
    {
        self.error_to_code = Some(Arc::new(codes));
        self
    }

    /// 设置日志消息的生成方式
    pub fn with_message_producer<F>(mut self, producer: F) -> Self
    where
        F: Fn(Context, &str, Code, Option<&Status>, Duration) -> (Context, String)
            + Send
            + Sync
            + 'static,
    {
        self.produce_message = Some(Arc::new(producer));
        self
    }
}

/// 调用方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Client,
    Server,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Client => "client",
            Direction::Server => "server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    ClientUnary,
    ClientStream,
    ServerUnary,
    ServerStream,
}

impl CallKind {
    fn direction(self) -> Direction {
        match self {
            CallKind::ClientUnary | CallKind::ClientStream => Direction::Client,
            CallKind::ServerUnary | CallKind::ServerStream => Direction::Server,
        }
    }

    fn message(self) -> &'static str {
        match self {
            CallKind::ClientUnary => "finished client unary call",
            CallKind::ClientStream => "finished client streaming call",
            CallKind::ServerUnary => "finished unary call",
            CallKind::ServerStream => "finished streaming call",
        }
    }
}

/// 调用日志策略
///
/// 构造后不可变，由同一个拦截器处理的所有调用共享
pub struct CallLogger {
    log: Arc<dyn Logger>,
    should_log: Decider,
    error_to_code: ErrorToCode,
    code_to_level: CodeToLevel,
    produce_message: MessageProducer,
}

impl CallLogger {
    /// 用给定的默认级别映射构造，配置项中设置的策略优先
    pub fn new(
        log: impl Logger + 'static,
        default_levels: fn(Code) -> LogLevel,
        options: LoggingOptions,
    ) -> Self {
        Self {
            log: Arc::new(log),
            should_log: options
                .should_log
                .unwrap_or_else(|| Arc::new(default_decider)),
            error_to_code: options
                .error_to_code
                .unwrap_or_else(|| Arc::new(default_error_to_code)),
            code_to_level: options
                .code_to_level
                .unwrap_or_else(|| Arc::new(default_levels)),
            produce_message: options
                .produce_message
                .unwrap_or_else(|| Arc::new(default_message_producer)),
        }
    }

    pub fn should_log(&self, full_method: &str, err: Option<&Status>) -> bool {
        (self.should_log)(full_method, err)
    }

    pub fn error_to_code(&self, err: Option<&Status>) -> Code {
        (self.error_to_code)(err)
    }

    pub fn code_to_level(&self, code: Code) -> LogLevel {
        (self.code_to_level)(code)
    }

    /// 生成消息并按级别输出一条日志
    pub fn write(
        &self,
        ctx: Context,
        level: LogLevel,
        msg: &str,
        code: Code,
        err: Option<&Status>,
        duration: Duration,
    ) {
        let (ctx, msg) = (self.produce_message)(ctx, msg, code, err, duration);

        match level {
            LogLevel::Debug => self.log.debug(&ctx, &msg),
            LogLevel::Info => self.log.info(&ctx, &msg),
            LogLevel::Important => self.log.important(&ctx, &msg),
            LogLevel::Warn => self.log.warn(&ctx, &msg),
            LogLevel::Error => self.log.error(&ctx, &msg),
        }
    }

    /// 四种拦截器共用的调用前后逻辑
    pub(crate) async fn observe<T, C, Fut>(
        &self,
        kind: CallKind,
        ctx: Context,
        full_method: &str,
        call: C,
    ) -> Result<T, Status>
    where
        C: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let start = Instant::now();
        let ctx = call_context(&ctx, kind.direction(), full_method, Utc::now());

        let result = call(ctx.clone()).await;
        let duration = start.elapsed();
        let err = result.as_ref().err();

        // 客户端调用始终输出，不经过 decider
        if kind.direction() == Direction::Server && !self.should_log(full_method, err) {
            return result;
        }

        let code = self.error_to_code(err);
        let level = self.code_to_level(code);

        self.write(ctx, level, kind.message(), code, err, duration);

        result
    }
}

fn call_context(
    ctx: &Context,
    direction: Direction,
    full_method: &str,
    start: DateTime<Utc>,
) -> Context {
    let (service, method) = split_method(full_method);

    let ctx = ctx.with_fields([
        (FIELD_SYSTEM, "grpc".into()),
        (FIELD_KIND, direction.as_str().into()),
        (FIELD_SERVICE, service.into()),
        (FIELD_METHOD, method.into()),
        (FIELD_START_TIME, start.into()),
    ]);

    match ctx.deadline_time() {
        Some(deadline) => ctx.with_field(FIELD_DEADLINE, deadline),
        None => ctx,
    }
}
