//! Form processing and multipart support

use crate::model_type::{Bindable, ModelType, TypeShape};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Parse URL-encoded form data into ordered pairs
pub fn parse_form_pairs(body: &[u8]) -> Result<Vec<(String, String)>, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// Uploaded file data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFile {
    /// Form field the file was posted under
    pub name: String,

    /// Original filename
    pub filename: String,

    /// Content type (MIME type)
    pub content_type: String,

    /// File size in bytes
    pub size: usize,

    /// File data
    pub data: Vec<u8>,
}

impl FormFile {
    /// Create a new form file
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let size = data.len();
        Self {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            size,
            data,
        }
    }

    /// Get file extension
    pub fn extension(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Check if file is an image
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Check if file size exceeds limit
    pub fn exceeds_size(&self, max_bytes: usize) -> bool {
        self.size > max_bytes
    }

    /// A part with no content and no filename is an empty file input
    pub fn is_empty_input(&self) -> bool {
        self.size == 0 && self.filename.is_empty()
    }
}

impl Bindable for FormFile {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::FormFile)
    }
}

/// Every file posted under one field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormFileCollection(pub Vec<FormFile>);

impl Bindable for FormFileCollection {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::FormFileCollection)
    }
}

/// A parsed form: text fields (multi-valued, in submission order) and files.
///
/// Field lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCollection {
    pub fields: Vec<(String, Vec<String>)>,
    pub files: Vec<FormFile>,
}

impl FormCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` content
    pub fn from_urlencoded(body: &[u8]) -> Result<Self, Error> {
        let mut form = Self::new();
        for (name, value) in parse_form_pairs(body)? {
            form.append(name, value);
        }
        Ok(form)
    }

    /// Parse `multipart/form-data` content
    pub fn from_multipart(content_type: &str, body: &[u8]) -> Result<Self, Error> {
        let parser = MultipartParser::from_content_type(content_type)?;
        let mut form = Self::new();
        for field in parser.parse(body)? {
            match field.file {
                Some(file) => form.files.push(file),
                None => form.append(field.name, field.value.unwrap_or_default()),
            }
        }
        Ok(form)
    }

    /// Add a value to a field, creating the field if needed
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((name, vec![value])),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn with_file(mut self, file: FormFile) -> Self {
        self.files.push(file);
        self
    }

    /// All values of a field; empty when absent
    pub fn get(&self, name: &str) -> &[String] {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Files posted under `name` (case-insensitive)
    pub fn files_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormFile> + 'a {
        self.files.iter().filter(move |f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }
}

impl Bindable for FormCollection {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::FormCollection)
    }
}

/// Multipart form field
#[derive(Debug, Clone)]
pub struct FormField {
    /// Field name
    pub name: String,

    /// Field value (for text fields)
    pub value: Option<String>,

    /// File data (for file fields)
    pub file: Option<FormFile>,
}

/// Multipart form data parser
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        // Example: "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW"
        let boundary = content_type
            .split(';')
            .find_map(|part| {
                let part = part.trim();
                part.strip_prefix("boundary=")
                    .map(|b| b.trim_matches('"').to_string())
            })
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::BadRequest("Missing boundary in Content-Type".to_string()))?;

        Ok(Self { boundary })
    }

    /// Parse multipart form data; part content is kept byte-exact
    pub fn parse(&self, body: &[u8]) -> Result<Vec<FormField>, Error> {
        let delimiter = format!("--{}", self.boundary).into_bytes();
        let mut fields = Vec::new();

        let mut pos = find(body, &delimiter, 0).ok_or_else(|| {
            Error::BadRequest("Multipart body does not contain the boundary".to_string())
        })?;

        loop {
            pos += delimiter.len();
            if body[pos..].starts_with(b"--") {
                break;
            }
            pos = skip_line_break(body, pos);

            let end = find(body, &delimiter, pos).ok_or_else(|| {
                Error::BadRequest("Unterminated multipart section".to_string())
            })?;
            let part = trim_trailing_line_break(&body[pos..end]);
            fields.push(self.parse_part(part)?);
            pos = end;
        }

        Ok(fields)
    }

    /// Parse a single multipart part
    fn parse_part(&self, part: &[u8]) -> Result<FormField, Error> {
        let (head, content) = match find(part, b"\r\n\r\n", 0) {
            Some(i) => (&part[..i], &part[i + 4..]),
            None => match find(part, b"\n\n", 0) {
                Some(i) => (&part[..i], &part[i + 2..]),
                None => (part, &[][..]),
            },
        };

        let head = String::from_utf8_lossy(head);
        let mut name = None;
        let mut filename = None;
        let mut content_type = None;

        for line in head.lines() {
            let Some((header, value)) = line.split_once(':') else {
                continue;
            };
            if header.trim().eq_ignore_ascii_case("content-disposition") {
                for attr in value.split(';') {
                    let attr = attr.trim();
                    if let Some(v) = attr.strip_prefix("name=") {
                        name = Some(v.trim_matches('"').to_string());
                    } else if let Some(v) = attr.strip_prefix("filename=") {
                        filename = Some(v.trim_matches('"').to_string());
                    }
                }
            } else if header.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
        }

        let name = name.ok_or_else(|| Error::BadRequest("Missing field name".to_string()))?;

        if let Some(filename) = filename {
            let file = FormFile::new(
                name.clone(),
                filename,
                content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                content.to_vec(),
            );
            Ok(FormField {
                name,
                value: None,
                file: Some(file),
            })
        } else {
            Ok(FormField {
                name,
                value: Some(String::from_utf8_lossy(content).into_owned()),
                file: None,
            })
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn skip_line_break(body: &[u8], pos: usize) -> usize {
    if body[pos..].starts_with(b"\r\n") {
        pos + 2
    } else if body[pos..].starts_with(b"\n") {
        pos + 1
    } else {
        pos
    }
}

fn trim_trailing_line_break(part: &[u8]) -> &[u8] {
    part.strip_suffix(b"\r\n")
        .or_else(|| part.strip_suffix(b"\n"))
        .unwrap_or(part)
}
