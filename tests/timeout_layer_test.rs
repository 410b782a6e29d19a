//! tower 超时注入层测试

use std::convert::Infallible;
use std::time::Duration;

use flare_grpc_middleware::{Context, MiddlewareConfig, TimeoutLayer, TimeoutSkipped, skip_timeout};
use tower::{Layer, ServiceExt, service_fn};

async fn echo_timeout(req: http::Request<()>) -> Result<Option<String>, Infallible> {
    Ok(req
        .headers()
        .get("grpc-timeout")
        .map(|value| value.to_str().unwrap().to_string()))
}

/// 把 tonic 请求的元数据转成 http 请求，扩展里的豁免标记一并带上
fn into_http<T>(request: tonic::Request<T>) -> http::Request<()> {
    let skipped = request.extensions().get::<TimeoutSkipped>().is_some();
    let mut http_request = http::Request::new(());
    *http_request.headers_mut() = request.into_parts().0.into_headers();

    if skipped {
        http_request.extensions_mut().insert(TimeoutSkipped);
    }

    http_request
}

#[tokio::test]
async fn test_layer_injects_grpc_timeout() {
    let service = TimeoutLayer::new(Duration::from_millis(20)).layer(service_fn(echo_timeout));

    let header = service.oneshot(http::Request::new(())).await.unwrap();

    assert_eq!(header.as_deref(), Some("20000000n"));
}

#[tokio::test]
async fn test_layer_keeps_existing_grpc_timeout() {
    let service = TimeoutLayer::new(Duration::from_secs(10)).layer(service_fn(echo_timeout));

    let (ctx, _cancel) = Context::background().with_timeout(Duration::from_secs(2));
    let mut request = tonic::Request::new(());
    ctx.apply_to_request(&mut request);

    let header = service.oneshot(into_http(request)).await.unwrap().unwrap();
    let timeout = flare_grpc_middleware::context::decode_grpc_timeout(&header).unwrap();

    assert!(timeout <= Duration::from_secs(2));
}

#[tokio::test]
async fn test_layer_respects_exempt_request() {
    let service = TimeoutLayer::new(Duration::from_secs(10)).layer(service_fn(echo_timeout));

    let ctx = skip_timeout(&Context::background());
    let mut request = tonic::Request::new(());
    ctx.apply_to_request(&mut request);

    assert!(request.extensions().get::<TimeoutSkipped>().is_some());

    let header = service.oneshot(into_http(request)).await.unwrap();
    assert!(header.is_none());
}

#[tokio::test]
async fn test_layer_zero_duration() {
    let service = TimeoutLayer::new(Duration::ZERO).layer(service_fn(echo_timeout));

    let header = service.oneshot(http::Request::new(())).await.unwrap();

    assert!(header.is_none());
}

#[tokio::test]
async fn test_layer_from_config() {
    let config = MiddlewareConfig::from_toml_str("[timeout]\ndefault_timeout_ms = 1500\n").unwrap();
    let service = config.timeout.layer().layer(service_fn(echo_timeout));

    let header = service.oneshot(http::Request::new(())).await.unwrap();

    assert_eq!(header.as_deref(), Some("1500000u"));
}
