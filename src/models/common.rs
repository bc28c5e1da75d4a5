use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 所有后台接口的统一响应包；成功时带 data，失败时带 error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// 机器可读错误码，如 ALREADY_PROCESSED / CONCURRENCY_TIMEOUT
    pub code: String,
    pub message: String,
    /// 原样重发同一审批请求是否可能成功（锁等待超时、死锁等）
    #[serde(default)]
    pub retryable: bool,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_envelope_shape() {
        let body = ApiResponse::failure(ApiError {
            code: "CONCURRENCY_TIMEOUT".to_string(),
            message: "Request is busy, retry later".to_string(),
            retryable: true,
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "success": false,
                "error": {
                    "code": "CONCURRENCY_TIMEOUT",
                    "message": "Request is busy, retry later",
                    "retryable": true
                }
            })
        );
    }

    #[test]
    fn test_success_envelope_omits_error() {
        let body = ApiResponse::success_with_message(vec![1, 2], "2 package requests reconciled");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["data"], json!([1, 2]));
        assert_eq!(value["message"], "2 package requests reconciled");
        assert!(value.get("error").is_none());
    }
}
