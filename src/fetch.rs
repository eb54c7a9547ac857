use std::time::Duration;

use indicatif::ProgressBar;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use tracing::info;

use crate::error::Result;
use crate::settings::Settings;

/// Download the source page. Any non-success status is returned as an error
/// straight away; there is no retry.
pub fn fetch_page(settings: &Settings) -> Result<String> {
    let client = Client::builder().timeout(settings.timeout()).build()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("GET {}", settings.url));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let response = client
        .get(&settings.url)
        .header(USER_AGENT, settings.user_agent.as_str())
        .header(ACCEPT_LANGUAGE, settings.accept_language.as_str())
        .header(REFERER, settings.referer.as_str())
        .send()
        .and_then(|r| r.error_for_status());
    spinner.finish_and_clear();

    let response = response?;
    info!(status = response.status().as_u16(), url = %settings.url, "Fetched page");
    Ok(response.text()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer one request with `response` and hand back the raw request head.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/wiki/records", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (url, handle)
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (url, server) =
            serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let settings = Settings {
            url,
            ..Settings::default()
        };

        let err = fetch_page(&settings).err().unwrap();
        assert!(matches!(err, Error::Http(_)), "{:?}", err);

        let request = server.join().unwrap();
        assert!(request.starts_with("get /wiki/records "));
        assert!(request.contains("user-agent: mozilla/5.0\r\n"));
        assert!(request.contains("accept-language: es-es,es;q=0.9\r\n"));
        assert!(request.contains("referer: https://www.google.com/\r\n"));
    }

    #[test]
    fn success_returns_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 21\r\nConnection: close\r\n\r\n<table></table>\n<p>ok",
        );
        let settings = Settings {
            url,
            ..Settings::default()
        };

        let body = fetch_page(&settings).unwrap();
        assert_eq!(body, "<table></table>\n<p>ok");
        server.join().unwrap();
    }
}
