#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use labsum::ai::Summarizer;
use labsum::core::models::{AnalyzeRequest, SummaryResult};
use labsum::errors::AnalyzeError;
use lopdf::content::{Content, Operation};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const BOUNDARY: &str = "----labsumTestBoundary7MA4YWxk";

/// Builds a PDF with one page per entry, each page showing its lines of text.
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in *lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).expect("page count fits in i64");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize test pdf");
    out
}

/// RC4 (standard handler, revision 2) encrypted copy of [`pdf_with_pages`].
///
/// Without `/U` the empty user password is accepted, like a file that only
/// carries an owner password. With `require_user_password` the `/U` entry
/// matches no empty password, so opening it needs a real one.
pub fn encrypted_pdf(pages: &[&[&str]], require_user_password: bool) -> Vec<u8> {
    let mut doc = Document::load_mem(&pdf_with_pages(pages)).expect("reload test pdf");

    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => 1_i64,
        "R" => 2_i64,
        "Length" => 40_i64,
        "P" => -4_i64,
        "O" => Object::String(vec![0x5a; 32], StringFormat::Hexadecimal),
    };
    if require_user_password {
        encrypt.set(
            "U",
            Object::String(vec![0xa5; 32], StringFormat::Hexadecimal),
        );
    }
    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    let file_id = Object::String(b"labsum-test-file".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    // RC4 is symmetric, so the decrypt routine also encrypts.
    let key = get_encryption_key(&doc, "", false).expect("derive file key");
    for (&id, object) in &mut doc.objects {
        if id == encrypt_id {
            continue;
        }
        let Ok(cipher) = decrypt_object(&key, id, &*object) else {
            continue;
        };
        match object {
            Object::Stream(stream) => stream.set_content(cipher),
            Object::String(content, _) => *content = cipher,
            _ => {}
        }
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize encrypted test pdf");
    out
}

pub fn two_page_report() -> Vec<u8> {
    pdf_with_pages(&[
        &["CITY LAB - Complete Blood Count", "Hemoglobin 10.1 g/dL (L)"],
        &["Lipid panel", "LDL Cholesterol 182 mg/dL (H)"],
    ])
}

/// One-file `multipart/form-data` body.
pub fn multipart_body(filename: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub fn post_request(filename: &str, payload: &[u8]) -> AnalyzeRequest {
    AnalyzeRequest {
        request_id: "test-request".to_string(),
        method: "POST".to_string(),
        content_type: Some(multipart_content_type()),
        body: multipart_body(filename, payload),
    }
}

/// In-process stand-in for the provider.
pub struct FakeSummarizer {
    outcome: Box<dyn Fn() -> Result<SummaryResult, AnalyzeError> + Send + Sync>,
    delay: Option<Duration>,
    pub received: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn answering(content: &str) -> Arc<Self> {
        let content = content.to_string();
        Arc::new(Self {
            outcome: Box::new(move || {
                Ok(SummaryResult {
                    content: content.clone(),
                })
            }),
            delay: None,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn failing<F>(make_error: F) -> Arc<Self>
    where
        F: Fn() -> AnalyzeError + Send + Sync + 'static,
    {
        Arc::new(Self {
            outcome: Box::new(move || Err(make_error())),
            delay: None,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: Box::new(|| {
                Ok(SummaryResult {
                    content: "too late".to_string(),
                })
            }),
            delay: Some(delay),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<SummaryResult, AnalyzeError> {
        self.received.lock().unwrap().push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.outcome)()
    }
}

/// Minimal HTTP server answering every request with the same canned response.
///
/// Returns the base URL and a counter of requests served.
pub async fn canned_http_server(
    status_line: &'static str,
    extra_headers: &'static str,
    body: &'static str,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/v1"), hits)
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            return;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
