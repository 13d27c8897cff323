//! 侧边栏菜单与页面路径解析

use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::models::ApiResponse;
use crate::routes::Route;

#[derive(Debug, Serialize)]
pub struct MenuItem {
    pub path: Route,
    pub title: &'static str,
}

impl From<Route> for MenuItem {
    fn from(route: Route) -> Self {
        Self {
            title: route.title(),
            path: route,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ResolvedRoute {
    #[serde(flatten)]
    pub item: MenuItem,
    /// 请求路径与规范路径不同时给出跳转
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

pub async fn menu() -> Result<HttpResponse> {
    let items: Vec<MenuItem> = Route::menu().into_iter().map(MenuItem::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

pub async fn resolve(query: web::Query<ResolveQuery>) -> Result<HttpResponse> {
    match Route::parse(&query.path) {
        Some(route) => {
            let canonical = route.path();
            let redirect = (query.path.trim_end_matches('/') != canonical).then(|| canonical.clone());
            let resolved = ResolvedRoute {
                item: route.into(),
                redirect,
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(resolved)))
        }
        None => Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(format!(
            "页面不存在: {}",
            query.path
        )))),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/navigation")
            .route("/menu", web::get().to(menu))
            .route("/resolve", web::get().to(resolve)),
    );
}
