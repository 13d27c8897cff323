//! 配置模块
//!
//! 从 JSON 文件加载网关配置，再用环境变量覆盖

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{JsonFileStore, MemoryStore, PersistentStore};
use crate::client::ClientOptions;
use crate::ws::WsOptions;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 后端 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST 基础地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 行情推送地址
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// AI 流式响应超时时间（秒）
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 持久化文件路径（缓存镜像、登录凭证、最近浏览）；`:memory:` 表示不落盘
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// 不落盘的存储路径
pub const MEMORY_STORE: &str = ":memory:";

impl StoreConfig {
    /// 打开存储，`:memory:` 使用进程内存储，重启后清空
    pub fn open(&self) -> anyhow::Result<Arc<dyn PersistentStore>> {
        if self.path == MEMORY_STORE {
            log::info!("使用内存存储，重启后登录状态与缓存不会保留");
            return Ok(Arc::new(MemoryStore::new()));
        }
        Ok(Arc::new(JsonFileStore::open(&self.path)?))
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "http://localhost:8000/api/v1".to_string() }
fn default_ws_url() -> String { "ws://localhost:8000/ws".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_stream_timeout() -> u64 { 300 }
fn default_store_path() -> String { "data/store.json".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            stream_timeout_secs: default_stream_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
        }
    }

    pub fn ws_options(&self) -> WsOptions {
        WsOptions {
            url: self.ws_url.clone(),
            ..Default::default()
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值，最后应用环境变量
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        let mut config = None;
        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(loaded) => {
                        log::info!("从 {} 加载配置成功", path);
                        config = Some(loaded);
                        break;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            log::info!("使用默认配置");
            Self::default()
        });
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// 环境变量覆盖：API_BASE_URL、WS_URL、STORE_PATH、BIND_ADDR
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("WS_URL") {
            self.api.ws_url = url;
        }
        if let Some(path) = lookup("STORE_PATH") {
            self.store.path = path;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            match addr.rsplit_once(':').map(|(h, p)| (h, p.parse::<u16>())) {
                Some((host, Ok(port))) => {
                    self.server.host = host.to_string();
                    self.server.port = port;
                }
                _ => log::warn!("BIND_ADDR 格式无效: {}", addr),
            }
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// `:memory:` 不创建文件
    #[test]
    fn test_memory_store_path() {
        let config = StoreConfig {
            path: MEMORY_STORE.to_string(),
        };
        let store = config.open().unwrap();
        store.set_item("access_token", "tok").unwrap();
        assert_eq!(store.get_item("access_token").unwrap().as_deref(), Some("tok"));
        assert!(!Path::new(MEMORY_STORE).exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "api": { "base_url": "http://10.0.0.2:8000/api/v1" } }"#).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000/api/v1");
        assert_eq!(config.api.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.client_options().stream_timeout, Duration::from_secs(300));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.store.path, "data/store.json");
    }

    /// 环境变量优先于配置文件
    #[test]
    fn test_env_overrides() {
        println!("\n========== 测试环境变量覆盖 ==========");
        let vars: HashMap<&str, &str> = [
            ("API_BASE_URL", "http://backend:8000/api/v1"),
            ("WS_URL", "ws://backend:8000/ws"),
            ("STORE_PATH", "/tmp/quant.json"),
            ("BIND_ADDR", "127.0.0.1:9090"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://backend:8000/api/v1");
        assert_eq!(config.api.ws_options().url, "ws://backend:8000/ws");
        assert_eq!(config.store.path, "/tmp/quant.json");
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.api.client_options().timeout, Duration::from_secs(30));
        println!("✅ 环境变量覆盖测试通过！");
    }

    #[test]
    fn test_invalid_bind_addr_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "BIND_ADDR").then(|| "nonsense".to_string()));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
