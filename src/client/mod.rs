//! 量化后端 API 客户端
//!
//! 封装对后端 REST 接口的调用：
//! - 拼接基础地址，附带 `Authorization: Bearer` 头
//! - 解析 JSON 响应，统一错误类型
//! - 401 时清除本地登录凭证并发出跳转登录页的导航事件

pub mod error;

use futures::future::{AbortRegistration, Abortable};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

use crate::cache::PersistentStore;
use crate::models::{MaybeEnveloped, User};
use crate::routes::Route;

pub use error::{ApiError, NO_RESPONSE_MESSAGE};

/// 登录 token 的存储键
pub const TOKEN_KEY: &str = "access_token";
/// 当前用户信息的存储键
pub const USER_KEY: &str = "user";
/// 无查询参数
pub const NO_QUERY: &[(&str, &str)] = &[];

// ==================== 登录凭证 ====================

/// 登录凭证存储
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn PersistentStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// 当前 token
    pub fn token(&self) -> Option<String> {
        match self.store.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                log::warn!("读取登录凭证失败: {}", e);
                None
            }
        }
    }

    /// 当前用户
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get_item(USER_KEY).ok()??;
        serde_json::from_str(&raw).ok()
    }

    /// 保存登录结果
    pub fn save(&self, token: &str, user: &User) -> anyhow::Result<()> {
        self.store.set_item(TOKEN_KEY, token)?;
        self.store.set_item(USER_KEY, &serde_json::to_string(user)?)?;
        Ok(())
    }

    /// 清除登录凭证
    pub fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove_item(key) {
                log::warn!("清除登录凭证 {} 失败: {}", key, e);
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

// ==================== 客户端 ====================

/// 客户端选项
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// 后端基础地址，如 `http://localhost:8000/api/v1`
    pub base_url: String,
    /// 默认请求超时
    pub timeout: Duration,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 流式响应的整体超时
    pub stream_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            stream_timeout: Duration::from_secs(300),
        }
    }
}

/// 后端 API 客户端
///
/// 内部的 `reqwest::Client` 和存储都是共享引用，克隆开销很小。
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: TokenStore,
    navigation: broadcast::Sender<Route>,
    stream_timeout: Duration,
}

impl ApiClient {
    /// 创建客户端
    pub fn new(options: &ClientOptions, store: Arc<dyn PersistentStore>) -> anyhow::Result<Self> {
        // 基础地址以 `/` 结尾，`Url::join` 才会保留最后一段路径
        let mut base = options.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let http = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .gzip(true)
            .build()?;

        let (navigation, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url,
            tokens: TokenStore::new(store),
            navigation,
            stream_timeout: options.stream_timeout,
        })
    }

    /// 登录凭证
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// 流式请求使用的超时，替代默认的整体超时
    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout
    }

    /// 订阅导航事件（401 时发出 `/login`）
    pub fn subscribe_navigation(&self) -> broadcast::Receiver<Route> {
        self.navigation.subscribe()
    }

    /// 拼接完整地址
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::RequestSetup(format!("{}: {}", path, e)))
    }

    /// 构造请求
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.http.request(method, self.url(path)?))
    }

    // ==================== 常用请求 ====================

    /// GET 请求
    pub async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        self.execute(builder).await
    }

    /// 指定超时的 GET 请求
    pub async fn get_with_timeout<T, Q>(
        &self,
        path: &str,
        query: &Q,
        timeout: Duration,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query).timeout(timeout);
        self.execute(builder).await
    }

    /// POST JSON 请求
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        self.execute(builder).await
    }

    /// 参数放在查询串中的 POST 请求
    pub async fn post_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path)?.query(query);
        self.execute(builder).await
    }

    /// 表单 POST 请求
    pub async fn post_form<T, F>(&self, path: &str, form: &F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path)?.form(form);
        self.execute(builder).await
    }

    /// PUT JSON 请求
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.execute(builder).await
    }

    /// DELETE 请求
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::DELETE, path)?;
        self.execute(builder).await
    }

    /// GET 请求，兼容 `{code, message, data}` 包装与直接返回两种形态
    pub async fn get_enveloped<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body: MaybeEnveloped<T> = self.get(path, query).await?;
        unwrap_envelope(body)
    }

    // ==================== 底层执行 ====================

    /// 发送请求并解析 JSON 响应
    pub async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// 发送请求，返回成功的原始响应（流式读取时使用）
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let builder = match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let request = builder
            .build()
            .map_err(|e| ApiError::RequestSetup(e.to_string()))?;

        log::debug!("📡 {} {}", request.method(), request.url());

        let response = self
            .http
            .execute(request)
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            log::warn!("后端返回错误 {}: {}", status, err);
            return Err(err);
        }
        Ok(response)
    }

    /// 登录失效：清除凭证并跳转登录页
    fn handle_unauthorized(&self) {
        log::warn!("登录已失效，清除本地凭证");
        self.tokens.clear();
        // 没有订阅者时发送失败，可以忽略
        let _ = self.navigation.send(Route::Login);
    }
}

/// 解开后端包装
pub fn unwrap_envelope<T>(body: MaybeEnveloped<T>) -> Result<T, ApiError> {
    match body {
        MaybeEnveloped::Wrapped(envelope) if envelope.is_ok() => Ok(envelope.data),
        MaybeEnveloped::Wrapped(envelope) => Err(ApiError::Server {
            status: u16::try_from(envelope.code).unwrap_or(500),
            message: if envelope.message.is_empty() {
                format!("请求失败，业务码 {}", envelope.code)
            } else {
                envelope.message
            },
        }),
        MaybeEnveloped::Bare(data) => Ok(data),
    }
}

/// 在可取消的上下文中执行请求
///
/// 对应的 `AbortHandle::abort()` 被调用后返回 `ApiError::Cancelled`
pub async fn abortable<T, F>(fut: F, registration: AbortRegistration) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    Abortable::new(fut, registration)
        .await
        .map_err(|_| ApiError::Cancelled)?
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 测试用假后端

    use actix_web::{dev::ServerHandle, App, HttpServer};
    use std::net::TcpListener;

    /// 启动假后端，返回基础地址和服务句柄
    pub fn spawn_backend<F>(configure: F) -> (String, ServerHandle)
    where
        F: Fn(&mut actix_web::web::ServiceConfig) + Send + Clone + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = HttpServer::new(move || App::new().configure(configure.clone()))
            .workers(1)
            .listen(listener)
            .unwrap()
            .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://127.0.0.1:{}/api/v1", port), handle)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::spawn_backend;
    use super::*;
    use crate::cache::MemoryStore;
    use actix_web::{web, HttpResponse};
    use futures::future::AbortHandle;
    use serde_json::{json, Value};

    fn client_for(base_url: &str) -> (ApiClient, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url: base_url.to_string(),
            ..ClientOptions::default()
        };
        (ApiClient::new(&options, store.clone()).unwrap(), store)
    }

    #[test]
    fn test_url_join_keeps_prefix() {
        let (client, _) = client_for("http://localhost:8000/api/v1");
        assert_eq!(
            client.url("/market/quote/600519").unwrap().as_str(),
            "http://localhost:8000/api/v1/market/quote/600519"
        );
        assert_eq!(
            client.url("stocks").unwrap().as_str(),
            "http://localhost:8000/api/v1/stocks"
        );
    }

    /// 401 清除 token 并发出登录跳转
    #[actix_web::test]
    async fn test_unauthorized_purges_token() {
        println!("\n========== 测试401处理 ==========");
        let (base, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/market/quote/{code}",
                web::get().to(|| async {
                    HttpResponse::Unauthorized().json(json!({"detail": "Not authenticated"}))
                }),
            );
        });
        let (client, store) = client_for(&base);
        store.set_item(TOKEN_KEY, "expired-token").unwrap();
        store.set_item(USER_KEY, r#"{"id":1}"#).unwrap();
        let mut nav = client.subscribe_navigation();

        let result: Result<Value, ApiError> = client.get("/market/quote/600519", NO_QUERY).await;
        assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(store.get_item(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get_item(USER_KEY).unwrap(), None);
        assert_eq!(nav.try_recv().unwrap(), Route::Login);

        handle.stop(true).await;
        println!("✅ 401处理测试通过！");
    }

    /// 携带 Bearer token，并提取 detail 错误信息
    #[actix_web::test]
    async fn test_bearer_and_error_detail() {
        let (base, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/auth/me",
                web::get().to(|req: actix_web::HttpRequest| async move {
                    let auth = req
                        .headers()
                        .get("Authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    HttpResponse::Ok().json(json!({ "auth": auth }))
                }),
            )
            .route(
                "/api/v1/stocks/{code}",
                web::get().to(|| async {
                    HttpResponse::NotFound().json(json!({"detail": "股票不存在"}))
                }),
            );
        });
        let (client, store) = client_for(&base);
        store.set_item(TOKEN_KEY, "abc").unwrap();

        let me: Value = client.get("/auth/me", NO_QUERY).await.unwrap();
        assert_eq!(me["auth"], "Bearer abc");

        let err = client.get::<Value, _>("/stocks/000000", NO_QUERY).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 404,
                message: "股票不存在".to_string()
            }
        );
        handle.stop(true).await;
    }

    /// 连接失败归类为 NoResponse
    #[actix_web::test]
    async fn test_no_response() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (client, _) = client_for(&format!("http://127.0.0.1:{}/api/v1", port));
        let err = client.get::<Value, _>("/health", NO_QUERY).await.unwrap_err();
        assert!(matches!(err, ApiError::NoResponse { .. }));
    }

    #[test]
    fn test_unwrap_envelope() {
        let ok: MaybeEnveloped<u32> =
            serde_json::from_value(json!({"code": 200, "message": "ok", "data": 7})).unwrap();
        assert_eq!(unwrap_envelope(ok).unwrap(), 7);

        let failed: MaybeEnveloped<Option<u32>> =
            serde_json::from_value(json!({"code": 400, "message": "板块不存在", "data": null}))
                .unwrap();
        assert_eq!(
            unwrap_envelope(failed).unwrap_err().to_string(),
            "板块不存在"
        );
    }

    /// 取消后返回 Cancelled
    #[actix_web::test]
    async fn test_abortable_cancelled() {
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();
        let result = abortable(async { Ok::<_, ApiError>(1) }, registration).await;
        assert_eq!(result, Err(ApiError::Cancelled));
    }
}
