use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::validate::ValidatedPayload;

/// Form field holding the JSON half of a multipart upload
pub const PAYLOAD_JSON_FIELD: &str = "payload_json";

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to serialize request body")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read file {name}")]
    FileRead {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// One field of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<&'static str>,
    pub data: Vec<u8>,
}

/// Multipart body whose parts are already read into memory. The boundary and
/// the matching `multipart/form-data` content type are generated by the
/// multipart writer when the body is turned into a [`Form`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    pub parts: Vec<FormPart>,
}

impl MultipartBody {
    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name == name)
    }

    pub fn into_form(self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for part in self.parts {
            let mut body = Part::bytes(part.data);
            if let Some(filename) = part.filename {
                body = body.file_name(filename);
            }
            if let Some(content_type) = part.content_type {
                body = body.mime_str(content_type)?;
            }
            form = form.part(part.name, body);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Vec<u8>),
    Multipart(MultipartBody),
}

/// Everything needed to issue a request, independent of the HTTP client that
/// ends up sending it
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Sets a JSON body. serde_json never escapes html characters so `&`,
    /// `<` and `>` reach discord as written.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, EncodingError> {
        self.body = RequestBody::Json(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        // the multipart writer sets its own content type with the boundary
        self.headers.remove(CONTENT_TYPE);
        self.body = RequestBody::Multipart(body);
        self
    }
}

/// Turns a validated payload into a request. Payloads without files become a
/// plain JSON body. Payloads with files become a multipart body with the JSON
/// under `payload_json` and each file under `files[i]`, `i` being its position
/// in the payload. File streams are drained here and dropped with the payload.
pub fn encode(
    method: Method,
    url: Url,
    payload: ValidatedPayload,
) -> Result<RequestDescriptor, EncodingError> {
    let mut payload = payload;
    let request = RequestDescriptor::new(method, url);
    if !payload.payload().has_files() {
        return request.json(payload.payload());
    }

    let files = std::mem::take(&mut payload.payload_mut().files);
    let mut parts = Vec::with_capacity(files.len() + 1);
    parts.push(FormPart {
        name: PAYLOAD_JSON_FIELD.to_owned(),
        filename: None,
        content_type: Some("application/json"),
        data: serde_json::to_vec(payload.payload())?,
    });
    for (index, mut file) in files.into_iter().enumerate() {
        let data = file.drain().map_err(|source| EncodingError::FileRead {
            name: file.name.clone(),
            source,
        })?;
        debug!("Attaching {} ({} bytes) as files[{}]", file.name, data.len(), index);
        parts.push(FormPart {
            name: format!("files[{}]", index),
            filename: Some(file.name),
            content_type: None,
            data,
        });
    }
    Ok(request.multipart(MultipartBody { parts }))
}

/// Collects query parameters before they're appended to a url. Unset values
/// and `false` flags are left out.
#[derive(Debug, Default)]
pub struct UrlBuilder {
    pub params: Vec<(&'static str, String)>,
}

impl UrlBuilder {
    pub fn flag(&mut self, key: &'static str, value: bool) -> &mut Self {
        if value {
            self.params.push((key, value.to_string()));
        }
        self
    }

    pub fn optional(&mut self, key: &'static str, value: &Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.params.push((key, value.clone()));
        }
        self
    }

    pub fn build(&self, base_url: &Url) -> Url {
        let mut url = base_url.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use serde_json::{json, Value};

    use super::*;
    use crate::models::{Embed, EmbedField, MessagePayload, WebhookFile};
    use crate::validate::{validate, ClientDefaults};

    fn url() -> Url {
        Url::parse("https://discord.com/api/webhooks/1/token").unwrap()
    }

    fn encoded(payload: MessagePayload, defaults: &ClientDefaults) -> RequestDescriptor {
        encode(Method::POST, url(), validate(payload, defaults).unwrap()).unwrap()
    }

    fn json_body(request: &RequestDescriptor) -> &[u8] {
        match &request.body {
            RequestBody::Json(body) => body,
            other => panic!("expected a json body, got {:?}", other),
        }
    }

    #[test]
    fn no_files_means_json() {
        let request = encoded(MessagePayload::new().content("hi"), &ClientDefaults::default());
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(json_body(&request), br#"{"content":"hi"}"#);
    }

    #[test]
    fn defaults_reach_the_body() {
        let defaults = ClientDefaults {
            username: Some("Bot".to_owned()),
            avatar_url: Some("http://a".to_owned()),
        };
        let request = encoded(MessagePayload::new().content("hi"), &defaults);
        let body = String::from_utf8(json_body(&request).to_vec()).unwrap();
        assert!(body.contains(r#""username":"Bot""#));
        assert!(body.contains(r#""avatar_url":"http://a""#));

        let request = encoded(
            MessagePayload::new().content("hi").username("Override"),
            &defaults,
        );
        let body = String::from_utf8(json_body(&request).to_vec()).unwrap();
        assert!(body.contains(r#""username":"Override""#));
        assert!(!body.contains(r#""username":"Bot""#));
    }

    #[test]
    fn html_characters_are_not_escaped() {
        let content = "<@123> fish & chips → 🐟 https://x.io/?a=1&b=2";
        let request = encoded(MessagePayload::new().content(content), &ClientDefaults::default());
        let body = String::from_utf8(json_body(&request).to_vec()).unwrap();
        assert!(body.contains(content));
        assert!(!body.contains("\\u0026"));
        assert!(!body.contains("\\u003c"));
    }

    #[test]
    fn json_body_reads_back_into_the_payload() {
        let payload = MessagePayload::new()
            .content("deploy finished")
            .username("ci")
            .tts(false)
            .embed(
                Embed::new()
                    .title("build #42")
                    .color(0x29A44C)
                    .field(EmbedField::new("branch", "main").inline(true)),
            )
            .thread_name("deploys")
            .applied_tag("7");
        let original = serde_json::to_value(&payload).unwrap();
        let request = encoded(payload, &ClientDefaults::default());

        let decoded: MessagePayload = serde_json::from_slice(json_body(&request)).unwrap();
        assert_eq!(serde_json::to_value(&decoded).unwrap(), original);
        assert_eq!(decoded.embeds[0].fields[0].inline, Some(true));
        assert!(decoded.files.is_empty());
    }

    #[test]
    fn one_file_makes_two_parts() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xFF];
        let payload = MessagePayload::new()
            .content("hi")
            .file(WebhookFile::from_bytes("image.png", bytes.clone()));
        let request = encoded(payload, &ClientDefaults::default());

        assert!(request.headers.get(CONTENT_TYPE).is_none());
        let body = match request.body {
            RequestBody::Multipart(body) => body,
            other => panic!("expected a multipart body, got {:?}", other),
        };
        assert_eq!(body.parts.len(), 2);

        let json_part = body.part(PAYLOAD_JSON_FIELD).unwrap();
        let value: Value = serde_json::from_slice(&json_part.data).unwrap();
        assert_eq!(value, json!({ "content": "hi" }));
        assert!(value.get("files").is_none());

        let file_part = body.part("files[0]").unwrap();
        assert_eq!(file_part.filename.as_deref(), Some("image.png"));
        assert_eq!(file_part.data, bytes);
    }

    #[test]
    fn file_keys_follow_their_position() {
        let payload = MessagePayload::new()
            .file(WebhookFile::from_bytes("a.txt", "a"))
            .file(WebhookFile::from_bytes("b.txt", "b"))
            .file(WebhookFile::from_bytes("c.txt", "c"));
        let request = encoded(payload, &ClientDefaults::default());
        let body = match request.body {
            RequestBody::Multipart(body) => body,
            other => panic!("expected a multipart body, got {:?}", other),
        };
        let names = body.parts.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["payload_json", "files[0]", "files[1]", "files[2]"]);
        assert_eq!(body.part("files[2]").unwrap().data, b"c");
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn unreadable_file_aborts_encoding() {
        let payload = MessagePayload::new().file(WebhookFile::new("broken.log", Broken));
        let validated = validate(payload, &ClientDefaults::default()).unwrap();
        match encode(Method::POST, url(), validated) {
            Err(EncodingError::FileRead { name, source }) => {
                assert_eq!(name, "broken.log");
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("expected a read failure, got {:?}", other),
        }
    }

    #[test]
    fn multipart_converts_into_a_form() {
        let body = MultipartBody {
            parts: vec![FormPart {
                name: PAYLOAD_JSON_FIELD.to_owned(),
                filename: None,
                content_type: Some("application/json"),
                data: b"{}".to_vec(),
            }],
        };
        let form = body.into_form().unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[test]
    fn query_params_go_on_the_url() {
        let mut builder = UrlBuilder::default();
        builder
            .flag("wait", true)
            .flag("with_components", false)
            .optional("thread_id", &Some("55".to_owned()));
        let built = builder.build(&url());
        assert_eq!(
            built.as_str(),
            "https://discord.com/api/webhooks/1/token?wait=true&thread_id=55"
        );
        assert_eq!(UrlBuilder::default().build(&url()), url());
    }
}
