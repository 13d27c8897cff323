//! 数据下载管理模型

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 单只股票下载请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadRequest {
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_download: Option<bool>,
}

/// 批量下载请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchDownloadRequest {
    pub stock_codes: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// 下载状态
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Completed,
    Exists,
    PartialOverlap,
    Failed,
}

/// 下载回执
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadResponse {
    pub status: DownloadStatus,
    pub message: String,
    #[serde(default)]
    pub download_id: String,
    pub stock_code: String,
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub data_count: Option<u64>,
    #[serde(default)]
    pub record_id: Option<i64>,
    #[serde(default)]
    pub existing_data: Option<Value>,
}

/// 批量下载回执
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchDownloadResponse {
    pub total: u32,
    pub success: u32,
    pub failed: u32,
    #[serde(default)]
    pub results: Vec<DownloadResponse>,
}

/// 已有数据的重叠方式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapType {
    Exact,
    Partial,
}

/// 数据可用性检查结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CheckDataResponse {
    pub available: bool,
    #[serde(default)]
    pub overlap_type: Option<OverlapType>,
    #[serde(default)]
    pub existing_data: Option<Value>,
}

/// 已下载数据记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadedData {
    pub id: i64,
    pub stock_code: String,
    #[serde(default)]
    pub stock_name: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub frequency: String,
    pub data_count: u64,
    pub downloaded_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_size_str: String,
}

/// 已下载列表
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadedListResponse {
    pub downloads: Vec<DownloadedData>,
    pub total: u64,
}

/// 下载统计
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadStatistics {
    pub total_downloads: u64,
    pub unique_stocks: u64,
    pub total_data_points: u64,
    pub total_file_size: u64,
    #[serde(default)]
    pub total_file_size_str: String,
    #[serde(default)]
    pub frequency_distribution: BTreeMap<String, u64>,
}

/// 已下载列表查询参数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_code: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

impl Default for DownloadListQuery {
    fn default() -> Self {
        Self {
            stock_code: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}
