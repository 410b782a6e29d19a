//! 服务端日志拦截器测试

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::{assert_log_message, json_logger};
use flare_grpc_middleware::{
    Context, LogLevel, LoggingOptions, ServerStream, StreamServerInfo, StreamServerInterceptor,
    UnaryServerInfo, UnaryServerInterceptor, WrappedServerStream, stream_server_interceptor,
    unary_server_interceptor,
};
use serde_json::{Value, json};
use tonic::{Code, Status};

const UNARY_METHOD: &str = "/grpctest.ItemService/GetItem";
const STREAM_METHOD: &str = "/grpctest.ItemService/ListItems";

fn expected_record(msg: &str, method: &str, level: &str, code: &str) -> Value {
    json!({
        "level": level,
        "time": "<ignore-diff>",
        "msg": msg,
        "system": "grpc",
        "span.kind": "server",
        "grpc.service": "grpctest.ItemService",
        "grpc.method": method,
        "grpc.start_time": "<ignore-diff>",
        "grpc.code": code,
        "grpc.duration_ms": "<ignore-diff>",
    })
}

#[tokio::test]
async fn test_unary_server_should_not_log() {
    let (logger, buf) = json_logger(LogLevel::Debug);
    let interceptor = unary_server_interceptor(
        logger,
        LoggingOptions::new().with_decider(|_, _| false),
    );

    let result: Result<(), Status> = interceptor
        .intercept(
            Context::background(),
            (),
            &UnaryServerInfo::new(UNARY_METHOD),
            |_, _| async { Err(Status::internal("internal error")) },
        )
        .await;

    assert_eq!(result.unwrap_err().code(), Code::Internal);
    assert_log_message("", &buf.contents());
}

#[tokio::test]
async fn test_unary_server_decider_sees_method_and_error() {
    let (logger, buf) = json_logger(LogLevel::Debug);
    let interceptor = unary_server_interceptor(
        logger,
        LoggingOptions::new().with_decider(|method, err| {
            method == UNARY_METHOD && err.map(Status::code) == Some(Code::NotFound)
        }),
    );
    let info = UnaryServerInfo::new(UNARY_METHOD);

    let _: Result<(), Status> = interceptor
        .intercept(Context::background(), (), &info, |_, _| async { Ok(()) })
        .await;
    assert_log_message("", &buf.contents());

    let _: Result<(), Status> = interceptor
        .intercept(Context::background(), (), &info, |_, _| async {
            Err(Status::not_found("missing"))
        })
        .await;

    let mut expected = expected_record("finished unary call", "GetItem", "info", "NotFound");
    expected["error"] = "rpc error: code = NotFound desc = missing".into();
    assert_log_message(&expected.to_string(), &buf.contents());
}

#[tokio::test]
async fn test_unary_server_error_written_at_warn() {
    let (logger, buf) = json_logger(LogLevel::Warn);
    let interceptor = unary_server_interceptor(logger, LoggingOptions::new());

    let result: Result<(), Status> = interceptor
        .intercept(
            Context::background(),
            (),
            &UnaryServerInfo::new(UNARY_METHOD),
            |_, _| async { Err(Status::internal("internal error")) },
        )
        .await;

    assert_eq!(result.unwrap_err().message(), "internal error");

    let mut expected = expected_record("finished unary call", "GetItem", "error", "Internal");
    expected["error"] = "rpc error: code = Internal desc = internal error".into();
    assert_log_message(&expected.to_string(), &buf.contents());
}

#[tokio::test]
async fn test_unary_server_success_at_info() {
    let (logger, buf) = json_logger(LogLevel::Info);
    let interceptor = unary_server_interceptor(logger, LoggingOptions::new());

    let resp = interceptor
        .intercept(
            Context::background(),
            "ping",
            &UnaryServerInfo::new(UNARY_METHOD),
            |ctx, req| async move {
                assert_eq!(ctx.field("span.kind"), Some(&"server".into()));
                Ok(format!("{req}-pong"))
            },
        )
        .await;

    assert_eq!(resp.unwrap(), "ping-pong");
    assert_log_message(
        &expected_record("finished unary call", "GetItem", "info", "OK").to_string(),
        &buf.contents(),
    );
}

#[tokio::test]
async fn test_unary_server_with_deadline() {
    let (logger, buf) = json_logger(LogLevel::Debug);
    let interceptor = unary_server_interceptor(logger, LoggingOptions::new());
    let (ctx, _cancel) = Context::background().with_timeout(Duration::from_secs(3600));

    let _: Result<(), Status> = interceptor
        .intercept(ctx, (), &UnaryServerInfo::new(UNARY_METHOD), |_, _| async {
            Ok(())
        })
        .await;

    let mut expected = expected_record("finished unary call", "GetItem", "info", "OK");
    expected["grpc.request.deadline"] = "<ignore-diff>".into();
    assert_log_message(&expected.to_string(), &buf.contents());
}

#[tokio::test]
async fn test_unary_server_custom_message_producer() {
    let (logger, buf) = json_logger(LogLevel::Debug);
    let interceptor = unary_server_interceptor(
        logger,
        LoggingOptions::new().with_message_producer(|ctx, msg, code, _, _| {
            (
                ctx.with_field("outcome", format!("{code:?}")),
                format!("{msg}!"),
            )
        }),
    );

    let _: Result<(), Status> = interceptor
        .intercept(
            Context::background(),
            (),
            &UnaryServerInfo::new(UNARY_METHOD),
            |_, _| async { Ok(()) },
        )
        .await;

    let record: Value = serde_json::from_str(buf.contents().trim()).unwrap();
    assert_eq!(record["msg"], "finished unary call!");
    assert_eq!(record["outcome"], "Ok");
    assert!(record.get("grpc.code").is_none());
}

#[tokio::test]
async fn test_stream_server_should_not_log() {
    let (logger, buf) = json_logger(LogLevel::Debug);
    let interceptor = stream_server_interceptor(
        logger,
        LoggingOptions::new().with_decider(|_, _| false),
    );

    let stream = WrappedServerStream::new((), Context::background());
    let result = interceptor
        .intercept(stream, &StreamServerInfo::new(STREAM_METHOD), |_| async {
            Err(Status::internal("internal error"))
        })
        .await;

    assert_eq!(result.unwrap_err().code(), Code::Internal);
    assert_log_message("", &buf.contents());
}

#[tokio::test]
async fn test_stream_server_error_written_at_warn() {
    let (logger, buf) = json_logger(LogLevel::Warn);
    let interceptor = stream_server_interceptor(logger, LoggingOptions::new());

    let stream = WrappedServerStream::new((), Context::background());
    let result = interceptor
        .intercept(stream, &StreamServerInfo::new(STREAM_METHOD), |_| async {
            Err(Status::internal("internal error"))
        })
        .await;

    assert!(result.is_err());

    let mut expected =
        expected_record("finished streaming call", "ListItems", "error", "Internal");
    expected["error"] = "rpc error: code = Internal desc = internal error".into();
    assert_log_message(&expected.to_string(), &buf.contents());
}

#[tokio::test]
async fn test_stream_server_handler_sees_call_fields() {
    let (logger, buf) = json_logger(LogLevel::Info);
    let interceptor = stream_server_interceptor(logger, LoggingOptions::new());
    let called = Arc::new(AtomicBool::new(false));

    let (ctx, _cancel) = Context::background().with_timeout(Duration::from_secs(3600));
    let stream = WrappedServerStream::new(vec![1, 2, 3], ctx);

    let seen = called.clone();
    let result = interceptor
        .intercept(stream, &StreamServerInfo::new(STREAM_METHOD), |stream| async move {
            assert_eq!(stream.context().field("grpc.method"), Some(&"ListItems".into()));
            assert_eq!(stream.inner(), &vec![1, 2, 3]);
            seen.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(result.is_ok());
    assert!(called.load(Ordering::SeqCst));

    let mut expected = expected_record("finished streaming call", "ListItems", "info", "OK");
    expected["grpc.request.deadline"] = "<ignore-diff>".into();
    assert_log_message(&expected.to_string(), &buf.contents());
}
