//! Shared request/response types and recording interceptors.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use wrapchain_intercept::{interceptor_fn, Interceptor, Next};

#[derive(Debug, Clone)]
pub struct Request {
    pub user: Option<String>,
    pub delay: Duration,
}

impl Request {
    pub fn authed(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user: None,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Unauthorized,
    Handler(String),
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Rejects anonymous requests; records its pre and post steps.
pub fn auth(log: Log) -> impl Interceptor<Request, Response, AppError> {
    interceptor_fn(move |req: Request, next: Next<Request, Response, AppError>| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push("Auth.pre".to_string());
            if req.user.is_none() {
                return Err(AppError::Unauthorized);
            }
            let result = next.run(req).await;
            log.lock().unwrap().push("Auth.post".to_string());
            result
        }
    })
}

/// Base handler: greets the user after the requested delay.
pub async fn handle(log: Log, req: Request) -> Result<Response, AppError> {
    log.lock().unwrap().push("H".to_string());
    if !req.delay.is_zero() {
        tokio::time::sleep(req.delay).await;
    }
    match req.user {
        Some(user) if user == "crash" => Err(AppError::Handler("handler crashed".to_string())),
        Some(user) => Ok(Response(format!("hello {user}"))),
        None => Ok(Response("hello stranger".to_string())),
    }
}
