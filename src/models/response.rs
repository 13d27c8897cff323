//! 通用响应模型
//!
//! - `ApiResponse`: 网关对外返回的统一格式
//! - `Envelope`: 量化后端返回的 `{code, message, data}` 包装
//! - `PaginatedResponse`: 后端分页结果

use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};

/// 获取北京时间（UTC+8）
pub fn get_beijing_time() -> chrono::DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Shanghai)
}

/// 统一 API 响应结构
///
/// 网关所有接口返回统一格式，包含：
/// - success: 请求是否成功
/// - data: 响应数据（成功时有值）
/// - message: 响应消息
/// - timestamp: 响应时间戳（北京时间）
/// - redirect: 需要前端跳转的路径（仅 401 时出现）
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 请求是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 响应消息
    pub message: String,
    /// 响应时间戳（ISO 8601 格式）
    pub timestamp: String,
    /// 跳转路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            timestamp: get_beijing_time().to_rfc3339(),
            redirect: None,
        }
    }

    /// 创建错误响应
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: get_beijing_time().to_rfc3339(),
            redirect: None,
        }
    }

    /// 附加跳转路径
    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }
}

/// 后端包装响应 `{code, message, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// 业务状态码（200 或 0 表示成功）
    pub code: i64,
    /// 响应消息
    #[serde(default)]
    pub message: String,
    /// 响应数据
    pub data: T,
}

impl<T> Envelope<T> {
    /// 业务码是否表示成功
    pub fn is_ok(&self) -> bool {
        self.code == 200 || self.code == 0
    }
}

/// 后端响应的两种形态
///
/// 部分接口直接返回数据对象，部分接口包装在 `Envelope` 中。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
    Wrapped(Envelope<T>),
    Bare(T),
}

/// 分页响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// 后端简单状态回执（删除、刷新等）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMessage {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}
