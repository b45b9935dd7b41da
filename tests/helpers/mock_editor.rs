//! In-process stand-in for the editor plugin's WebSocket server.
//!
//! Every text frame the client sends is parsed, recorded and handed to a
//! handler that decides what the editor does in reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use super::TEST_TOKEN;

/// What the editor does in response to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send a JSON frame now
    Frame(Value),
    /// Send a JSON frame after a delay, without blocking later requests
    Delayed(Duration, Value),
    /// Send a raw text frame
    Raw(String),
    /// Drop the connection without a close frame
    Drop,
}

type Handler = Arc<dyn Fn(&Value) -> Vec<Reply> + Send + Sync>;
type Sink = Arc<tokio::sync::Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>>;

pub struct MockEditor {
    url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
}

impl MockEditor {
    /// Start a server that passes every request, `auth.hello` included, to `handler`.
    pub async fn start<H>(handler: H) -> Self
    where
        H: Fn(&Value) -> Vec<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Handler = Arc::new(handler);

        let accept_task = {
            let requests = Arc::clone(&requests);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve_connection(
                        tcp,
                        Arc::clone(&handler),
                        Arc::clone(&requests),
                    ));
                }
            })
        };

        Self {
            url,
            requests,
            connections,
            accept_task,
        }
    }

    /// Start a server that accepts [`TEST_TOKEN`] and passes every other
    /// request to `handler`.
    pub async fn accepting<H>(handler: H) -> Self
    where
        H: Fn(&Value) -> Vec<Reply> + Send + Sync + 'static,
    {
        Self::start(move |request| {
            if method_of(request) == "auth.hello" {
                vec![hello_reply(request, TEST_TOKEN)]
            } else {
                handler(request)
            }
        })
        .await
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Methods received so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| method_of(request).to_string())
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until `count` requests for `method` have arrived.
    pub async fn wait_for(&self, method: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let seen = self.methods().iter().filter(|m| *m == method).count();
                if seen >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {} x {}", count, method));
    }
}

impl Drop for MockEditor {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(tcp: TcpStream, handler: Handler, requests: Arc<Mutex<Vec<Value>>>) {
    let Ok(ws) = tokio_tungstenite::accept_async(tcp).await else {
        return;
    };
    let (sink, mut stream) = ws.split();
    let sink: Sink = Arc::new(tokio::sync::Mutex::new(sink));

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        requests.lock().unwrap().push(request.clone());

        for reply in handler(&request) {
            match reply {
                Reply::Frame(frame) => send(&sink, frame.to_string()).await,
                Reply::Raw(text) => send(&sink, text).await,
                Reply::Delayed(delay, frame) => {
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        send(&sink, frame.to_string()).await;
                    });
                }
                // Dropping both halves closes the socket without a close frame
                Reply::Drop => return,
            }
        }
    }
}

async fn send(sink: &Sink, text: String) {
    let _ = sink.lock().await.send(Message::text(text)).await;
}

pub fn method_of(request: &Value) -> &str {
    request["method"].as_str().unwrap_or_default()
}

/// Success response echoing the request id.
pub fn result_for(request: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
}

/// Error response echoing the request id.
pub fn error_for(request: &Value, code: Value, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": request["id"], "error": {"code": code, "message": message}})
}

/// The plugin's answer to `auth.hello`.
pub fn hello_reply(request: &Value, expected_token: &str) -> Reply {
    if request["params"]["token"] == expected_token {
        Reply::Frame(result_for(
            request,
            json!({"ok": true, "editor_version": "4.3.stable"}),
        ))
    } else {
        Reply::Frame(error_for(request, json!("unauthorized"), "Invalid token"))
    }
}
