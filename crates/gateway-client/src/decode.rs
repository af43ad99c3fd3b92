//! Decode targets for success payloads
//!
//! The caller picks how a 2xx body is turned into a payload by choosing a
//! target type at the call site, e.g. `client.get::<Json<User>>(..)`.

use std::marker::PhantomData;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::transport::HttpResponse;

/// How a target reads the success body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    Json,
    Text,
    RawBinary,
    /// No payload: the body is not read on success.
    Empty,
}

/// A response shape a call can be decoded into.
pub trait DecodeTarget: Send + 'static {
    type Output: Send + 'static;

    const KIND: DecodeKind;

    /// Consume a 2xx response into the payload.
    fn decode(response: HttpResponse) -> Result<Self::Output>;
}

/// Parse the body as JSON into `T`.
///
/// A blank body decodes as JSON `null`, so `Option<T>` and `()` accept it
/// while structs report a decode error.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> DecodeTarget for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    const KIND: DecodeKind = DecodeKind::Json;

    fn decode(response: HttpResponse) -> Result<T> {
        let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &response.body
        };
        serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Return the raw body as text.
pub struct Text;

impl DecodeTarget for Text {
    type Output = String;

    const KIND: DecodeKind = DecodeKind::Text;

    fn decode(response: HttpResponse) -> Result<String> {
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }
}

/// An opaque binary payload with its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Return the raw bytes plus the response `Content-Type`.
pub struct Binary;

impl DecodeTarget for Binary {
    type Output = FileContent;

    const KIND: DecodeKind = DecodeKind::RawBinary;

    fn decode(response: HttpResponse) -> Result<FileContent> {
        let content_type = response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                // Media type only, parameters such as charset dropped.
                value.split(';').next().unwrap_or(value).trim().to_owned()
            })
            .unwrap_or_else(|| String::from("application/octet-stream"));
        Ok(FileContent {
            bytes: response.body,
            content_type,
        })
    }
}

/// No payload expected; the outcome collapses to success or problem.
pub struct NoContent;

impl DecodeTarget for NoContent {
    type Output = ();

    const KIND: DecodeKind = DecodeKind::Empty;

    fn decode(_response: HttpResponse) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde::Deserialize;

    fn response(body: &'static [u8], content_type: Option<&'static str>) -> HttpResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        HttpResponse {
            status: StatusCode::OK,
            url: "http://api.test/x".into(),
            headers,
            body: Bytes::from_static(body),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    #[test]
    fn json_decodes_struct() {
        let user = Json::<User>::decode(response(br#"{"id":1,"name":"ada"}"#, None)).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "ada".into()
            }
        );
    }

    #[test]
    fn json_blank_body_is_null() {
        assert_eq!(Json::<Option<User>>::decode(response(b"", None)).unwrap(), None);
        assert!(Json::<()>::decode(response(b"  \n", None)).is_ok());
        let err = Json::<User>::decode(response(b"", None)).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn json_malformed_body_is_decode_error() {
        let err = Json::<User>::decode(response(b"<html>oops</html>", None)).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn text_passes_body_through() {
        let text = Text::decode(response(b"\"ok\"", Some("application/json"))).unwrap();
        assert_eq!(text, "\"ok\"");
    }

    #[test]
    fn binary_keeps_bytes_and_media_type() {
        let file = Binary::decode(response(b"\x89PNG", Some("image/png; charset=binary"))).unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(&file.bytes[..], b"\x89PNG");
    }

    #[test]
    fn binary_without_content_type_defaults_to_octet_stream() {
        let file = Binary::decode(response(b"raw", None)).unwrap();
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[test]
    fn kinds_are_declared_per_target() {
        assert_eq!(Json::<User>::KIND, DecodeKind::Json);
        assert_eq!(Text::KIND, DecodeKind::Text);
        assert_eq!(Binary::KIND, DecodeKind::RawBinary);
        assert_eq!(NoContent::KIND, DecodeKind::Empty);
    }
}
