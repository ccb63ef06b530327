use bytes::Bytes;

pub(crate) const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A `multipart/form-data` body: text fields in insertion order, then one
/// file part.
#[derive(Clone, Debug)]
pub(crate) struct MultipartForm {
    fields: Vec<(String, String)>,
    file_field: String,
    file_name: String,
    file_body: Bytes,
    mime_type: String,
}

impl MultipartForm {
    pub(crate) fn new(
        file_field: impl Into<String>,
        file_name: impl Into<String>,
        file_body: impl Into<Bytes>,
        mime_type: Option<&str>,
    ) -> Self {
        let mime_type = match mime_type {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => DEFAULT_MIME_TYPE.to_string(),
        };

        Self {
            fields: Vec::new(),
            file_field: file_field.into(),
            file_name: file_name.into(),
            file_body: file_body.into(),
            mime_type,
        }
    }

    /// Adds a text field. Empty values still produce a part.
    pub(crate) fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Encodes with a fresh random boundary; returns the `Content-Type`
    /// value and the body.
    pub(crate) fn encode(&self) -> (String, Bytes) {
        self.encode_with_boundary(&random_boundary())
    }

    pub(crate) fn encode_with_boundary(&self, boundary: &str) -> (String, Bytes) {
        let file_name = escape_quotes(&self.file_name);

        let mut lines: Vec<Vec<u8>> = Vec::with_capacity(self.fields.len() * 4 + 7);
        for (name, value) in &self.fields {
            lines.push(format!("--{boundary}").into_bytes());
            lines.push(format!("Content-Disposition: form-data; name=\"{name}\"").into_bytes());
            lines.push(Vec::new());
            lines.push(value.clone().into_bytes());
        }
        lines.push(format!("--{boundary}").into_bytes());
        lines.push(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"",
                self.file_field
            )
            .into_bytes(),
        );
        lines.push(format!("Content-Type: {}", self.mime_type).into_bytes());
        lines.push(Vec::new());
        lines.push(self.file_body.to_vec());
        lines.push(format!("--{boundary}--").into_bytes());
        lines.push(Vec::new());

        let body = lines.join(&b"\r\n"[..]);
        (
            format!("multipart/form-data; boundary={boundary}"),
            Bytes::from(body),
        )
    }
}

/// 128 random bits in hex; collisions with body content are negligible.
pub(crate) fn random_boundary() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Escapes `\` and `"` for a quoted header parameter.
pub(crate) fn escape_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_backslash_and_quote() {
        assert_eq!(escape_quotes(r#"a"b.txt"#), r#"a\"b.txt"#);
        assert_eq!(escape_quotes(r"c:\dir\f"), r"c:\\dir\\f");
        assert_eq!(escape_quotes("plain"), "plain");
    }

    #[test]
    fn encodes_fields_then_file() {
        let form =
            MultipartForm::new("file", r#"a"b.txt"#, "hello", Some("text/plain")).field("a", "1");
        let (content_type, body) = form.encode_with_boundary("XYZ");
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");
        assert_eq!(
            body,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"a\"\r\n\
             \r\n\
             1\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a\\\"b.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hello\r\n\
             --XYZ--\r\n"
        );
        assert_eq!(body.matches("Content-Disposition").count(), 2);
        assert_eq!(body.matches("--XYZ--").count(), 1);
    }

    #[test]
    fn empty_field_value_still_emits_part() {
        let form = MultipartForm::new("file", "f", "", None).field("key", "");
        let (_, body) = form.encode_with_boundary("B");
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert!(body.starts_with(
            "--B\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\n\r\n--B\r\n"
        ));
        assert!(body.contains("Content-Type: application/octet-stream\r\n"));
    }

    #[test]
    fn binary_file_body_is_kept_verbatim() {
        let data = vec![0u8, 0xff, b'\r', b'\n', 0x80];
        let form = MultipartForm::new("file", "bin", data.clone(), Some("  "));
        let (_, body) = form.encode_with_boundary("B");
        let needle = [&b"\r\n\r\n"[..], &data[..], &b"\r\n--B--\r\n"[..]].concat();

        assert!(body.windows(needle.len()).any(|w| w == needle.as_slice()));
    }

    #[test]
    fn boundaries_are_random_hex() {
        let a = random_boundary();
        let b = random_boundary();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
