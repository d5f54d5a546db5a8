use serde::Serialize;

/// JSON envelope returned by every endpoint.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            status: "success",
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: "success",
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            status: "error",
            message: message.into(),
            data: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            status: "success",
            message: message.into(),
            data: None,
        }
    }
}
