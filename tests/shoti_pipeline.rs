//! End-to-end `/shoti` runs against loopback upstream APIs.
//!
//! Run with: cargo test --test shoti_pipeline

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shoti_bot::format::GENERIC_ERROR;
use shoti_bot::pipeline::{self, Messenger, Outcome, Presence, SendResult};
use shoti_bot::ApiClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const VIDEO_BODY: &str = r#"{"status":"success","shoti":{"title":"Dance","username":"alice","nickname":"Alice A","duration":15,"region":"US","videoUrl":"https://x/v.mp4"}}"#;

const PROFILE_BODY: &str = r#"{"username":"alice","nickname":"Alice A","signature":"hi","followerCount":1234567,"followingCount":3,"heartCount":42000,"videoCount":12,"privateAccount":false,"verified":false}"#;

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Video { url: String, caption: String },
    Text(String),
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<Sent>>,
}

#[async_trait]
impl Messenger for Recorder {
    async fn send_presence(&self, _presence: Presence) -> SendResult {
        Ok(())
    }

    async fn send_video(&self, url: &str, caption: &str) -> SendResult {
        self.sent.lock().unwrap().push(Sent::Video {
            url: url.into(),
            caption: caption.into(),
        });
        Ok(())
    }

    async fn send_text(&self, body: &str, _link_preview: bool) -> SendResult {
        self.sent.lock().unwrap().push(Sent::Text(body.into()));
        Ok(())
    }
}

/// Loopback server answering `/shoti` and `/tikstalk` with canned bodies.
/// Returns the base URL.
async fn upstream(video: (&'static str, &'static str), profile: (&'static str, &'static str)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);
            let (status, body) = if request.starts_with("GET /shoti") {
                video
            } else {
                profile
            };
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.ok();
            socket.shutdown().await.ok();
        }
    });
    format!("http://{addr}")
}

fn client(base: &str) -> ApiClient {
    ApiClient::new(
        format!("{base}/shoti"),
        format!("{base}/tikstalk"),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn video_and_profile_delivered_in_order() {
    let base = upstream(("200 OK", VIDEO_BODY), ("200 OK", PROFILE_BODY)).await;
    let recorder = Recorder::default();

    let outcome = pipeline::run(&client(&base), &recorder).await;

    assert_eq!(outcome, Outcome::Delivered);
    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0],
        Sent::Video {
            url: "https://x/v.mp4".into(),
            caption: "🎬 <b>Dance</b>\n📛 Username: @alice\n🏷 Nickname: Alice A\n⏱ Duration: 15 seconds\n🌍 Region: US\n\n".into(),
        }
    );
    let Sent::Text(profile) = &sent[1] else {
        panic!("expected profile text, got {:?}", sent[1]);
    };
    assert!(profile.contains("❤️ <b>Followers:</b> 1,234,567\n"));
    assert!(profile.contains("👍 <b>Likes:</b> 42,000\n"));
    assert!(profile.contains("✔️ <b>Verified:</b> No\n"));
}

#[tokio::test]
async fn profile_error_degrades_to_notice() {
    let base = upstream(("200 OK", VIDEO_BODY), ("200 OK", r#"{"error":"User not found"}"#)).await;
    let recorder = Recorder::default();

    let outcome = pipeline::run(&client(&base), &recorder).await;

    assert_eq!(outcome, Outcome::SecondaryDegraded);
    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], Sent::Video { .. }));
    assert_eq!(sent[1], Sent::Text("ℹ️ Couldn't fetch additional info for @alice".into()));
}

#[tokio::test]
async fn upstream_outage_sends_generic_error() {
    let base = upstream(("503 Service Unavailable", "{}"), ("200 OK", PROFILE_BODY)).await;
    let recorder = Recorder::default();

    let outcome = pipeline::run(&client(&base), &recorder).await;

    assert_eq!(outcome, Outcome::PrimaryFailed);
    assert_eq!(*recorder.sent.lock().unwrap(), vec![Sent::Text(GENERIC_ERROR.into())]);
}

#[tokio::test]
async fn non_json_video_body_sends_generic_error() {
    let base = upstream(("200 OK", "<html>maintenance</html>"), ("200 OK", PROFILE_BODY)).await;
    let recorder = Recorder::default();

    let outcome = pipeline::run(&client(&base), &recorder).await;

    assert_eq!(outcome, Outcome::PrimaryFailed);
    assert_eq!(*recorder.sent.lock().unwrap(), vec![Sent::Text(GENERIC_ERROR.into())]);
}

#[tokio::test]
async fn invocations_are_independent() {
    let base = upstream(("200 OK", VIDEO_BODY), ("200 OK", PROFILE_BODY)).await;
    let api = std::sync::Arc::new(client(&base));

    let runs = (0..4).map(|_| {
        let api = api.clone();
        tokio::spawn(async move {
            let recorder = Recorder::default();
            let outcome = pipeline::run(api.as_ref(), &recorder).await;
            (outcome, recorder.sent.lock().unwrap().len())
        })
    });

    for run in runs.collect::<Vec<_>>() {
        assert_eq!(run.await.unwrap(), (Outcome::Delivered, 2));
    }
}
