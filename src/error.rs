use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// HTTP-level error carrier with status, headers and structured context.
///
/// Pure data: the dispatcher decides what, if anything, reaches the client.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub message: String,
    pub code: String,
    pub data: HashMap<String, String>,
}

impl HttpError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        HttpError {
            status,
            headers: Vec::new(),
            message: message.into(),
            code: code.into(),
            data: HashMap::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "not_found", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(429, "too_many_requests", message).with_header("Retry-After", "60")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} ({}): {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Field-level validation failure carrier.
///
/// Keyed by field name, each field carrying the messages in the order they
/// were recorded. Not logged as a failure anywhere; callers render it.
#[derive(Debug, Clone, Default)]
pub struct ValidationError {
    pub errors_by_field: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(field: impl Into<String>) -> Self {
        let mut err = Self::new();
        let field = field.into();
        err.push(field.clone(), format!("{field} is required"));
        err
    }

    pub fn invalid_format(field: impl Into<String>) -> Self {
        let mut err = Self::new();
        let field = field.into();
        err.push(field.clone(), format!("{field} has an invalid format"));
        err
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors_by_field
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors_by_field.is_empty()
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.errors_by_field
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        let mut first = true;
        for (field, messages) in &self.errors_by_field {
            for message in messages {
                if first {
                    write!(f, ": ")?;
                    first = false;
                } else {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
