#![allow(dead_code)]

use std::error::Error;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;

use assert_cmd::Command;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("runpad-cli")?;
    cmd.env_remove("RUNPAD_API_URL");
    cmd.env_remove("REACT_APP_API_URL");
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

async fn echo_service(Json(body): Json<Value>) -> Json<Value> {
    let code = body["code"].as_str().unwrap_or_default();
    let language = body["language"].as_str().unwrap_or_default();
    if code.contains("raise") {
        return Json(json!({ "stderr": "Traceback: boom" }));
    }
    Json(json!({ "output": format!("[{language}] {code}\n") }))
}

/// Starts a fake execution service on a background thread and returns its base URL.
pub fn spawn_service() -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            tx.send(listener.local_addr().expect("addr")).expect("send addr");
            let app = Router::new().route("/run", post(echo_service));
            axum::serve(listener, app).await.expect("serve");
        });
    });
    let addr = rx.recv().expect("service address");
    format!("http://{addr}")
}

/// Base URL of a port nobody listens on.
pub fn closed_service() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
