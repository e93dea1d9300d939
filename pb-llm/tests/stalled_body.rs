//! Vendors that send headers and then go quiet. wiremock only delays whole
//! responses, so these use a raw TCP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pb_llm::{CODE_TIMEOUT, EnhanceRequest, Provider, RequestSettings, create_provider};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answers every connection with `head`, then holds the socket open without
/// writing anything else. Returns the address and a connection counter.
async fn stalling_server(head: &'static [u8]) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(head).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    (addr, calls)
}

fn openai_at(addr: SocketAddr) -> Provider {
    Provider {
        name: "openai".to_string(),
        api_key: "test-key".to_string(),
        model: "gpt-4.1-mini".to_string(),
        base_url: format!("http://{addr}"),
        enabled: true,
    }
}

fn short_timeout() -> RequestSettings {
    RequestSettings {
        timeout: Duration::from_millis(200),
        max_retries: 2,
        base_delay: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn stalled_body_is_a_retried_timeout() {
    let (addr, calls) = stalling_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"choices\":",
    )
    .await;
    let adapter = create_provider(openai_at(addr), short_timeout()).expect("known provider");

    let started = Instant::now();
    let err = adapter
        .enhance(&EnhanceRequest::new("stall after headers").expect("valid prompt"))
        .await
        .unwrap_err();

    let provider_err = err.as_provider_error().expect("provider error");
    assert_eq!(provider_err.code, CODE_TIMEOUT);
    assert!(provider_err.retryable);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn silent_stream_times_out_and_keeps_delivered_chunks() {
    let (addr, calls) = stalling_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n\
30\r\ndata: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\r\n",
    )
    .await;
    let adapter = create_provider(openai_at(addr), short_timeout()).expect("known provider");

    let mut seen: Vec<String> = Vec::new();
    let mut on_chunk = |c: &str| seen.push(c.to_string());
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        adapter.enhance_stream(
            &EnhanceRequest::new("stall mid stream").expect("valid prompt"),
            &mut on_chunk,
        ),
    )
    .await
    .expect("stream gives up before the outer deadline");

    let err = outcome.unwrap_err();
    assert_eq!(err.as_provider_error().map(|e| e.code.as_str()), Some(CODE_TIMEOUT));
    assert_eq!(seen, vec!["Hel"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
