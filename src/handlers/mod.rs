pub mod ai;
pub mod auth;
pub mod charts;
pub mod data;
pub mod health;
pub mod market;
pub mod navigation;
pub mod pages;
pub mod realtime;
pub mod reports;
pub mod stocks;
pub mod strategies;

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::cache::{PersistentStore, TtlCache};
use crate::client::{ApiClient, ApiError};
use crate::models::ApiResponse;
use crate::recent::RecentStocks;
use crate::routes::Route;
use crate::services::Services;
use crate::ws::QuoteStream;

/// 各处理器共享的状态
pub struct AppState {
    pub services: Services,
    pub cache: Arc<TtlCache>,
    pub recent: RecentStocks,
    pub client: ApiClient,
    /// 未配置推送地址时为 None
    pub quotes: Option<Arc<QuoteStream>>,
}

impl AppState {
    pub fn new(client: ApiClient, store: Arc<dyn PersistentStore>) -> Self {
        let cache = Arc::new(TtlCache::new(store.clone()));
        Self {
            services: Services::new(client.clone(), cache.clone(), store.clone()),
            cache,
            recent: RecentStocks::new(store),
            client,
            quotes: None,
        }
    }

    pub fn with_quotes(mut self, quotes: Arc<QuoteStream>) -> Self {
        self.quotes = Some(quotes);
        self
    }
}

/// 将客户端错误转换为统一错误响应
///
/// 401 附带登录页跳转；后端的错误状态码原样透传；无法连接后端为 502
pub fn error_response(e: &ApiError) -> HttpResponse {
    let body = ApiResponse::<()>::error(e.to_string());
    match e {
        ApiError::Unauthorized => {
            HttpResponse::Unauthorized().json(body.with_redirect(Route::Login.path()))
        }
        ApiError::Server { .. } => {
            let status = e
                .status()
                .and_then(|s| actix_web::http::StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
            HttpResponse::build(status).json(body)
        }
        ApiError::NoResponse { .. } => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(auth::config)
            .configure(navigation::config)
            .configure(realtime::config)
            .configure(pages::config)
            .configure(charts::config)
            .configure(market::config)
            .configure(stocks::config)
            .configure(strategies::config)
            .configure(data::config)
            .configure(ai::config)
            .configure(reports::config),
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::ClientOptions;

    /// 指向假后端的网关状态
    pub fn state(base_url: String) -> (web::Data<AppState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let client = ApiClient::new(&options, store.clone()).unwrap();
        (web::Data::new(AppState::new(client, store.clone())), store)
    }
}
