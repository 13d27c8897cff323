//! 客户端错误类型

use serde_json::Value;
use thiserror::Error;

/// 无法连接后端时的提示
pub const NO_RESPONSE_MESSAGE: &str = "无法连接到服务器，请检查后端服务是否运行";

/// 请求量化后端时可能出现的错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// 服务器返回了错误响应
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 请求已发出但没有收到响应（连接失败、超时）
    #[error("{}", NO_RESPONSE_MESSAGE)]
    NoResponse { detail: String },

    /// 请求未能构造
    #[error("请求配置错误: {0}")]
    RequestSetup(String),

    /// 登录已失效
    #[error("登录已过期，请重新登录")]
    Unauthorized,

    /// 响应内容与预期结构不符
    #[error("响应数据解析失败: {0}")]
    Decode(String),

    /// 请求被调用方取消
    #[error("请求已取消")]
    Cancelled,
}

impl ApiError {
    /// 由 reqwest 错误转换
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::RequestSetup(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::NoResponse {
                detail: err.to_string(),
            }
        }
    }

    /// 由错误响应构造，消息优先取 `detail`，其次 `message`
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Server {
            status,
            message: extract_message(body)
                .unwrap_or_else(|| format!("请求失败，状态码 {}", status)),
        }
    }

    /// HTTP 状态码（服务器错误时）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// 从错误响应体中提取提示信息
///
/// 支持 `{"detail": "..."}`、`{"detail": [{"msg": "..."}]}`（参数校验错误）
/// 和 `{"message": "..."}` 三种形态
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message() {
        println!("\n========== 测试错误信息提取 ==========");
        assert_eq!(
            extract_message(r#"{"detail":"股票不存在"}"#).as_deref(),
            Some("股票不存在")
        );
        assert_eq!(
            extract_message(r#"{"detail":[{"msg":"field required"},{"msg":"bad date"}]}"#)
                .as_deref(),
            Some("field required; bad date")
        );
        assert_eq!(
            extract_message(r#"{"message":"参数错误"}"#).as_deref(),
            Some("参数错误")
        );
        assert_eq!(extract_message("<html>502</html>"), None);
        println!("✅ 错误信息提取测试通过！");
    }

    #[test]
    fn test_server_error_fallback() {
        let err = ApiError::from_response(500, "");
        assert_eq!(err.to_string(), "请求失败，状态码 500");
        assert_eq!(err.status(), Some(500));

        let err = ApiError::NoResponse {
            detail: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), NO_RESPONSE_MESSAGE);
    }
}
