use std::thread;
use std::time::Duration;

use live_score::{FallbackRequest, FormPoster, LiveScoreError};
use log::{error, info};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;


const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Posts score-update forms over plain HTTP when the match socket can't be used. Each request
// runs on its own short-lived thread so that the event loop never waits for the server.
pub struct HttpFormPoster {
    client: Client,
}

impl HttpFormPoster {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HttpFormPoster { client })
    }
}

impl FormPoster for HttpFormPoster {
    fn post_form(&mut self, request: FallbackRequest) {
        let client = self.client.clone();
        thread::spawn(move || match post(&client, &request) {
            Ok(()) => info!("Posted score update to {}", request.url),
            Err(err) => error!("{}", err),
        });
    }
}

fn post(client: &Client, request: &FallbackRequest) -> Result<(), LiveScoreError> {
    let failed = |message: String| LiveScoreError::FallbackPost {
        url: request.url.clone(),
        message,
    };
    let response = client
        .post(&request.url)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .header("X-Requested-With", "XMLHttpRequest")
        .body(request.body.clone())
        .send()
        .map_err(|err| failed(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("server responded with {status}")));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    use pretty_assertions::assert_eq;

    use super::*;

    // Accepts one HTTP request and returns its request line, content type and body.
    fn serve_once(listener: TcpListener, status_line: &'static str) -> thread::JoinHandle<(String, String, String)> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_type = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (name, value) = line.split_once(':').unwrap();
                match name.to_ascii_lowercase().as_str() {
                    "content-type" => content_type = value.trim().to_owned(),
                    "content-length" => content_length = value.trim().parse().unwrap(),
                    _ => {}
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = stream;
            write!(stream, "{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").unwrap();
            (request_line.trim_end().to_owned(), content_type, String::from_utf8(body).unwrap())
        })
    }

    #[test]
    fn posts_form_encoded_body() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = serve_once(listener, "HTTP/1.1 200 OK");
        let poster = HttpFormPoster::new().unwrap();
        let request = FallbackRequest {
            url: format!("http://{addr}/match/42/update"),
            path: "/match/42/update".to_owned(),
            body: "home_score=121&innings=2".to_owned(),
        };
        post(&poster.client, &request).unwrap();
        let (request_line, content_type, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /match/42/update HTTP/1.1");
        assert_eq!(content_type, FORM_CONTENT_TYPE);
        assert_eq!(body, "home_score=121&innings=2");
    }

    #[test]
    fn error_status_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = serve_once(listener, "HTTP/1.1 403 Forbidden");
        let poster = HttpFormPoster::new().unwrap();
        let request = FallbackRequest {
            url: format!("http://{addr}/match/42/update"),
            path: "/match/42/update".to_owned(),
            body: "innings=2".to_owned(),
        };
        let err = post(&poster.client, &request).unwrap_err();
        assert!(matches!(err, LiveScoreError::FallbackPost { .. }), "{err}");
        server.join().unwrap();
    }
}
