//! A request handler wrapped in timing, authentication and error recovery.
//!
//! Run with:
//! ```sh
//! cargo run -p wrapchain --example logged_handler --features intercept
//! ```

use std::time::Duration;
use tower::{service_fn, ServiceExt};
use wrapchain::intercept::{interceptor_fn, recover, HandlerChain, Next, TimingLayer};

#[derive(Debug, Clone)]
struct Request {
    path: String,
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Response {
    status: u16,
    body: String,
}

#[derive(Debug, Clone)]
enum AppError {
    Unauthorized,
    NotFound(String),
}

type Chain = HandlerChain<Request, Response, AppError>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let timing = TimingLayer::builder()
        .name("api")
        .slow_threshold(Duration::from_millis(50))
        .on_complete(|duration, outcome| {
            println!("  timing: {outcome} in {:.2}ms", duration.as_secs_f64() * 1000.0);
        })
        .build()
        .layer();

    let auth = interceptor_fn(
        |req: Request, next: Next<Request, Response, AppError>| async move {
            match req.token.as_deref() {
                Some("secret") => next.run(req).await,
                _ => Err(AppError::Unauthorized),
            }
        },
    );

    let errors = recover(|err: AppError| match err {
        AppError::Unauthorized => Response {
            status: 401,
            body: "unauthorized".to_string(),
        },
        AppError::NotFound(path) => Response {
            status: 404,
            body: format!("no route for {path}"),
        },
    });

    let chain = Chain::builder()
        .name("api")
        .interceptor(errors)
        .layer(timing)
        .interceptor(auth)
        .build(service_fn(handle));

    let requests = [
        ("/hello", Some("secret")),
        ("/slow", Some("secret")),
        ("/hello", None),
        ("/missing", Some("secret")),
    ];

    for (path, token) in requests {
        println!("{path} (token: {token:?})");
        let req = Request {
            path: path.to_string(),
            token: token.map(str::to_string),
        };
        match chain.clone().oneshot(req).await {
            Ok(res) => println!("  -> {} {}", res.status, res.body),
            Err(err) => println!("  -> error {err:?}"),
        }
    }
}

async fn handle(req: Request) -> Result<Response, AppError> {
    match req.path.as_str() {
        "/hello" => Ok(Response {
            status: 200,
            body: "Hello World".to_string(),
        }),
        "/slow" => {
            tokio::time::sleep(Duration::from_millis(80)).await;
            Ok(Response {
                status: 200,
                body: "finally".to_string(),
            })
        }
        _ => Err(AppError::NotFound(req.path)),
    }
}
