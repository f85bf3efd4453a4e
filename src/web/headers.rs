use axum::http;
use headers::{Header, HeaderName, HeaderValue};

/// `Content-Disposition: attachment; filename="..."` for a download.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AttachmentDisposition(pub String);

impl AttachmentDisposition {
    pub fn file_name(&self) -> &str {
        &self.0
    }
}

// Keeps the quoted-string form valid and ASCII-only.
fn ascii_fallback(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}

// RFC 5987 value for `filename*`.
fn percent_encode_utf8(file_name: &str) -> String {
    let mut out = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn percent_decode_utf8(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl Header for AttachmentDisposition {
    fn name() -> &'static HeaderName {
        &http::header::CONTENT_DISPOSITION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        let value = value.to_str().map_err(|_| headers::Error::invalid())?;

        let mut params = value.split(';').map(str::trim);
        let disposition = params.next().unwrap_or("");
        if !disposition.eq_ignore_ascii_case("attachment") {
            return Err(headers::Error::invalid());
        }

        let mut plain = None;
        let mut extended = None;
        for param in params {
            let Some((key, raw)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let raw = raw.trim();
            if key.eq_ignore_ascii_case("filename*") {
                // charset'language'value
                extended = raw
                    .splitn(3, '\'')
                    .nth(2)
                    .and_then(percent_decode_utf8);
            } else if key.eq_ignore_ascii_case("filename") {
                plain = Some(raw.trim_matches('"').to_string());
            }
        }

        extended
            .or(plain)
            .filter(|name| !name.is_empty())
            .map(AttachmentDisposition)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let fallback = ascii_fallback(&self.0);
        let value = if fallback == self.0 {
            format!("attachment; filename=\"{}\"", fallback)
        } else {
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback,
                percent_encode_utf8(&self.0)
            )
        };

        if let Ok(value) = HeaderValue::from_str(&value) {
            values.extend(std::iter::once(value));
        }
    }
}
