// Minimal HTTP surface: the response being assembled and the GET-only front.
pub mod server;

pub use server::AppState;

/// The response a dispatch cycle writes into. Controllers append to the body
/// directly; the error fallback may discard and restart it.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    pub fn new() -> Self {
        Response {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html; charset=utf-8".to_string())],
            body: String::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Set a header, replacing any existing header of the same name
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        for (existing, slot) in self.headers.iter_mut() {
            if existing.eq_ignore_ascii_case(name) {
                *slot = value;
                return;
            }
        }
        self.headers.push((name.to_string(), value));
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn write(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Discard everything written so far, keeping only the defaults
    pub fn reset(&mut self) {
        *self = Response::new();
    }

    /// Serialize as an HTTP/1.1 response
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Connection: close\r\n\r\n");
        out.push_str(&self.body);
        out.into_bytes()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Escape a string for safe embedding in HTML (including attribute values)
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("it's"), "it&#039;s");
        assert_eq!(escape_html("plain_42"), "plain_42");
    }

    #[test]
    fn test_response_serialization() {
        let mut resp = Response::new();
        resp.write("hello");
        let bytes = resp.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_set_header_replaces() {
        let mut resp = Response::new();
        resp.set_header("content-type", "text/plain");
        let count = resp
            .headers()
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reset_discards_body_and_status() {
        let mut resp = Response::new();
        resp.set_status(500);
        resp.write("partial output");
        resp.reset();
        assert_eq!(resp.status(), 200);
        assert!(resp.body().is_empty());
    }
}
