use actix_web::{web, HttpResponse, Result};

use super::{error_response, AppState};
use crate::models::{ApiResponse, LoginForm, RegisterRequest};

/// 登录：接受表单或 JSON，成功后凭证保存在网关
pub async fn login(
    state: web::Data<AppState>,
    form: web::Either<web::Form<LoginForm>, web::Json<LoginForm>>,
) -> Result<HttpResponse> {
    let form = match form {
        web::Either::Left(f) => f.into_inner(),
        web::Either::Right(j) => j.into_inner(),
    };
    match state.services.auth.login(&form).await {
        Ok(token) => Ok(HttpResponse::Ok().json(ApiResponse::success(token))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    match state.services.auth.register(&body).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn current_user(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.auth.current_user().await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// 登出：后端失败时本地凭证也已清除
pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(e) = state.services.auth.logout().await {
        log::warn!("后端登出失败: {}", e);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success("已退出登录")))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/register", web::post().to(register))
            .route("/me", web::get().to(current_user))
            .route("/logout", web::post().to(logout)),
    );
}
