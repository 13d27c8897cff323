//! 认证服务
//!
//! 登录成功后把 token 和用户信息写入持久化存储；登出时无论后端是否成功都清除本地凭证。

use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::{LoginForm, RegisterRequest, StatusMessage, TokenResponse, User};

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 用户登录（表单提交）
    pub async fn login(&self, form: &LoginForm) -> Result<TokenResponse, ApiError> {
        let token: TokenResponse = self.client.post_form("/auth/login", form).await?;
        if !token.access_token.is_empty() {
            self.client
                .tokens()
                .save(&token.access_token, &token.user)
                .map_err(|e| ApiError::RequestSetup(format!("保存登录凭证失败: {}", e)))?;
            log::info!("用户 {} 登录成功", token.user.username);
        }
        Ok(token)
    }

    /// 用户注册
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.client.post("/auth/register", request).await
    }

    /// 当前用户
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.client.get("/auth/me", NO_QUERY).await
    }

    /// 登出
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .client
            .post::<StatusMessage, _>("/auth/logout", &serde_json::json!({}))
            .await;
        self.client.tokens().clear();
        result.map(|_| ())
    }
}
