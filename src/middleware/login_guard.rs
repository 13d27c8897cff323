//! 登录守卫中间件
//!
//! 本地没有保存登录凭证时，页面与业务接口统一返回 401 并提示跳转登录页。
//! 健康检查和认证接口不受限制。

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::client::TokenStore;
use crate::models::ApiResponse;
use crate::routes::Route;

/// 登录守卫
pub struct LoginGuard {
    tokens: TokenStore,
}

impl LoginGuard {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }
}

/// 不需要登录的接口
pub fn is_public_path(path: &str) -> bool {
    path.ends_with("/health") || path.contains("/auth/")
}

impl<S, B> Transform<S, ServiceRequest> for LoginGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = LoginGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(LoginGuardService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        })
    }
}

pub struct LoginGuardService<S> {
    service: Rc<S>,
    tokens: TokenStore,
}

impl<S, B> Service<ServiceRequest> for LoginGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let authenticated = self.tokens.is_authenticated();

        Box::pin(async move {
            if authenticated || is_public_path(req.path()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            log::debug!("未登录，拒绝访问 {}", req.path());
            let response = HttpResponse::Unauthorized().json(
                ApiResponse::<()>::error("请先登录".to_string()).with_redirect(Route::Login.path()),
            );
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, PersistentStore};
    use crate::client::TOKEN_KEY;
    use actix_web::{test, web, App};
    use std::sync::Arc;

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    /// 未登录时业务接口返回 401 与跳转路径，健康检查放行
    #[actix_web::test]
    async fn test_guard_redirects_to_login() {
        println!("\n========== 测试登录守卫 ==========");
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenStore::new(store.clone());

        let app = test::init_service(
            App::new()
                .wrap(LoginGuard::new(tokens))
                .route("/api/v1/health", web::get().to(ok_handler))
                .route("/api/v1/auth/login", web::post().to(ok_handler))
                .route("/api/v1/stocks", web::get().to(ok_handler)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
        assert_eq!(resp.status(), 200);
        let resp = test::call_service(&app, test::TestRequest::post().uri("/api/v1/auth/login").to_request()).await;
        assert_eq!(resp.status(), 200);

        let req = test::TestRequest::get().uri("/api/v1/stocks").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["redirect"], "/login");
        assert_eq!(body["success"], false);

        // 登录后放行
        store.set_item(TOKEN_KEY, "tok").unwrap();
        let req = test::TestRequest::get().uri("/api/v1/stocks").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        println!("✅ 登录守卫测试通过！");
    }
}
