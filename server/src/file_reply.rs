use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use utoipa::{
    openapi::{
        self, content::ContentBuilder, schema::KnownFormat, schema::SchemaFormat,
        schema::SchemaType, schema::Type, ObjectBuilder, RefOr, ResponseBuilder,
    },
    ToResponse,
};

/// Stored upload or result file sent back byte for byte.
pub struct FileReply {
    data: Vec<u8>,
    file_name: String,
}

impl FileReply {
    #[must_use]
    pub fn new(data: Vec<u8>, file_name: &str) -> Self {
        Self {
            data,
            file_name: file_name.to_owned(),
        }
    }

    fn content_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .to_string()
    }
}

impl IntoResponse for FileReply {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        let len = self.data.len().to_string();
        let disposition = format!(r#"inline; filename="{}""#, self.file_name);

        let mut res = Body::from(self.data).into_response();
        if let Ok(val) = HeaderValue::from_str(&content_type) {
            res.headers_mut().insert(header::CONTENT_TYPE, val);
        }
        if let Ok(val) = HeaderValue::from_str(&disposition) {
            res.headers_mut().insert(header::CONTENT_DISPOSITION, val);
        }
        if let Ok(val) = HeaderValue::from_str(&len) {
            res.headers_mut().insert(header::CONTENT_LENGTH, val);
        }

        res
    }
}

impl ToResponse<'static> for FileReply {
    fn response() -> (&'static str, RefOr<openapi::Response>) {
        let object = ObjectBuilder::new()
            .schema_type(SchemaType::Type(Type::String))
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Binary)))
            .build();
        let content = ContentBuilder::new().schema(Some(object)).build();
        (
            "FileReply",
            ResponseBuilder::new()
                .description("Stored file content")
                .content("application/octet-stream", content)
                .build()
                .into(),
        )
    }
}
