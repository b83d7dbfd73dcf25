//! End-to-end scenarios E1-E6, driven through `App::dispatch` against the in-process
//! transport boundary rather than any concrete socket layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use serde_json::json;

use turbo_core::app::AppBuilder;
use turbo_core::assembler::{ControllerMetadata, RouteRegistration};
use turbo_core::config::TurboConfig;
use turbo_core::context::{RawRequest, RequestContext};
use turbo_core::error::{DispatchError, HttpException};
use turbo_core::middleware::{CorsMiddleware, Middleware};
use turbo_core::route::{Classification, Handler, HandlerResult};

fn route(method: Method, subpath: &str, name: &str, handler: Handler) -> RouteRegistration {
    RouteRegistration {
        method,
        subpath: subpath.to_string(),
        params: Vec::new(),
        handler,
        classification: Classification::Sync,
        static_value: None,
        middleware: Vec::new(),
        handler_name: name.to_string(),
    }
}

fn request(method: Method, url: &str, headers: Vec<(&str, &str)>, body: &[u8]) -> RawRequest {
    RawRequest {
        method,
        url: url.to_string(),
        headers: headers.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        body: body.to_vec(),
    }
}

/// E1: `GET /` returning the string "ok" serves 200 text/plain "ok".
#[tokio::test]
async fn e1_text_response() {
    let app = AppBuilder::new(TurboConfig::default())
        .with_controller(
            ControllerMetadata::new("").with_route(route(
                Method::GET,
                "/",
                "root",
                Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Text("ok".to_string())))),
            )),
        )
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let response = app.dispatch(request(Method::GET, "/", vec![], b"")).await;
    assert_eq!(response.status, 200);
    assert!(response.headers.iter().any(|(k, v)| k == "content-type" && v.starts_with("text/plain")));
    assert_eq!(response.body, b"ok");
}

/// E2: `GET /json` returning `{ok:true}` serves 200 application/json.
#[tokio::test]
async fn e2_json_response() {
    let app = AppBuilder::new(TurboConfig::default())
        .with_controller(
            ControllerMetadata::new("").with_route(route(
                Method::GET,
                "/json",
                "get_json",
                Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Json(json!({"ok": true}))))),
            )),
        )
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let response = app.dispatch(request(Method::GET, "/json", vec![], b"")).await;
    assert_eq!(response.status, 200);
    assert!(response.headers.iter().any(|(k, v)| k == "content-type" && v == "application/json"));
    assert_eq!(response.body, br#"{"ok":true}"#);
}

/// E3: `GET /users/:id` returning `{id, name:"User"}` reflects the captured path param.
#[tokio::test]
async fn e3_path_param_capture() {
    let app = AppBuilder::new(TurboConfig::default())
        .with_controller(
            ControllerMetadata::new("").with_route(route(
                Method::GET,
                "/users/:id",
                "get_user",
                Handler::Sync(Arc::new(|ctx: &RequestContext| {
                    let id = ctx.path_param("id").unwrap().to_string();
                    Ok(HandlerResult::Json(json!({"id": id, "name": "User"})))
                })),
            )),
        )
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let response = app.dispatch(request(Method::GET, "/users/abc", vec![], b"")).await;
    assert_eq!(response.body, br#"{"id":"abc","name":"User"}"#);
}

/// E4: `POST /json` binding the body echoes it back.
#[tokio::test]
async fn e4_body_binding() {
    let app = AppBuilder::new(TurboConfig::default())
        .with_controller(
            ControllerMetadata::new("").with_route(route(
                Method::POST,
                "/json",
                "post_json",
                Handler::Async(Arc::new(|ctx: &RequestContext| {
                    Box::pin(async move {
                        let body = ctx.parse_body()?.unwrap_or(serde_json::Value::Null);
                        Ok(HandlerResult::Json(json!({"ok": true, "body": body})))
                    })
                })),
            )),
        )
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let response = app.dispatch(request(Method::POST, "/json", vec![], br#"{"x":1}"#)).await;
    assert_eq!(response.body, br#"{"body":{"x":1},"ok":true}"#.to_vec());
}

struct RequireAuthHeader;

impl Middleware for RequireAuthHeader {
    fn before(&self, ctx: &RequestContext) -> Result<Option<HandlerResult>, DispatchError> {
        if ctx.header("x-auth").is_none() {
            return Err(HttpException::unauthorized("missing x-auth header").into());
        }
        Ok(None)
    }
}

/// E5: a middleware returning 401 when `x-auth` is missing keeps the handler from
/// running; with the header present the handler runs and the response is 200.
#[tokio::test]
async fn e5_middleware_short_circuit() {
    let handler_calls = Arc::new(AtomicUsize::new(0));
    let handler_calls2 = handler_calls.clone();

    let mut registration = route(
        Method::GET,
        "/secure",
        "secure",
        Handler::Sync(Arc::new(move |_ctx| {
            handler_calls2.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerResult::Text("ok".to_string()))
        })),
    );
    registration.middleware.push(Arc::new(RequireAuthHeader));

    let app = AppBuilder::new(TurboConfig::default())
        .with_controller(ControllerMetadata::new("").with_route(registration))
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let unauthorised = app.dispatch(request(Method::GET, "/secure", vec![], b"")).await;
    assert_eq!(unauthorised.status, 401);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);

    let authorised = app.dispatch(request(Method::GET, "/secure", vec![("x-auth", "token")], b"")).await;
    assert_eq!(authorised.status, 200);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
}

/// E6: a preflight `OPTIONS` request for an allowed origin gets 204, the echoed
/// origin, and the configured allow-methods/headers.
#[tokio::test]
async fn e6_cors_preflight() {
    let cors = CorsMiddleware::new(
        vec!["https://a.example".to_string()],
        vec!["Content-Type".to_string()],
        vec![Method::GET, Method::POST],
        false,
        vec![],
        None,
    );

    let app = AppBuilder::new(TurboConfig::default())
        .with_global_middleware(Arc::new(cors))
        .with_controller(
            ControllerMetadata::new("").with_route(route(
                Method::GET,
                "/anything",
                "anything",
                Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Text("ok".to_string())))),
            )),
        )
        .build()
        .await
        .unwrap();
    app.serve().await.unwrap();

    let response = app
        .dispatch(request(
            Method::OPTIONS,
            "/anything",
            vec![
                ("host", "api.internal"),
                ("origin", "https://a.example"),
                ("access-control-request-method", "POST"),
            ],
            b"",
        ))
        .await;

    assert_eq!(response.status, 204);
    assert!(response.headers.iter().any(|(k, v)| k == "access-control-allow-origin" && v == "https://a.example"));
    assert!(response.headers.iter().any(|(k, v)| k == "access-control-allow-methods" && v.contains("GET")));
    assert!(response.headers.iter().any(|(k, v)| k == "access-control-allow-headers" && v.contains("Content-Type")));
}

/// Unmatched routes are a plain 404 (§9 Open Question: matched-path-wrong-method is
/// also a plain 404, not 405, preserved from source behaviour).
#[tokio::test]
async fn unmatched_route_is_404() {
    let app = AppBuilder::new(TurboConfig::default()).build().await.unwrap();
    app.serve().await.unwrap();
    let response = app.dispatch(request(Method::GET, "/nope", vec![], b"")).await;
    assert_eq!(response.status, 404);
}
