use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, message?, ...data}`; `data` fields are inlined at the top level.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that carry only a status and message.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: Status::Success,
            message: Some(message.into()),
            data,
        }
    }
}

impl ApiResponse<Empty> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::success(message, Empty {})
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: Empty {},
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiKeyData {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedServerData {
    pub owned_server: String,
    pub secret_key: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCodeData {
    pub new_code: String,
}

/// Chart series for the analytics page, oldest day first.
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_inlines_data() {
        let body = serde_json::to_value(ApiResponse::success(
            "API key updated.",
            ApiKeyData {
                api_key: "abc".to_string(),
            },
        ))
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "status": "success",
                "message": "API key updated.",
                "api_key": "abc"
            })
        );
    }

    #[test]
    fn test_error_shape() {
        let body = serde_json::to_value(ApiResponse::error("nope")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "status": "error", "message": "nope" })
        );
    }
}
