//! 量化交易看板网关
//!
//! 代理量化后端的 REST 接口，维护登录状态与本地缓存，
//! 并把行情、K 线、回测结果组装成页面可直接使用的数据和 ECharts 配置。

mod cache;      // 带过期时间的两级缓存
mod charts;     // ECharts 配置构建
mod client;     // 后端 HTTP 客户端与令牌
mod config;     // 配置加载
mod formatters; // 数字格式化
mod handlers;   // HTTP 请求处理器
mod indicators; // 技术指标计算
mod middleware; // 中间件
mod models;     // 数据模型定义
mod pages;      // 页面视图模型
mod recent;     // 最近访问的股票
mod routes;     // 页面路由
mod services;   // 业务服务
mod ws;         // 实时行情 WebSocket

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::io;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::middleware::LoginGuard;
use crate::ws::{QuoteStream, WsEvent};

fn to_io_error(e: anyhow::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{:#}", e))
}

/// 实时行情连接，事件写入日志
fn spawn_quote_stream(config: &AppConfig, client: &ApiClient) -> QuoteStream {
    let stream = QuoteStream::connect(config.api.ws_options(), client.tokens().clone());
    let mut events = stream.events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(WsEvent::Connected) => log::info!("实时行情已连接"),
                Ok(WsEvent::Disconnected) => log::warn!("实时行情连接断开"),
                Ok(WsEvent::Message(msg)) => log::debug!("实时行情消息: {}", msg.kind),
                Ok(WsEvent::GaveUp(reason)) => {
                    log::error!("{}", reason);
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("实时行情事件积压，丢弃 {} 条", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    stream
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load();
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    let store = config.store.open().map_err(to_io_error)?;
    let client = ApiClient::new(&config.api.client_options(), store.clone()).map_err(to_io_error)?;
    let quotes = if config.api.ws_url.is_empty() {
        None
    } else {
        Some(Arc::new(spawn_quote_stream(&config, &client)))
    };
    let mut state = AppState::new(client.clone(), store.clone());
    if let Some(quotes) = &quotes {
        state = state.with_quotes(quotes.clone());
    }
    let state = web::Data::new(state);

    let removed = state.cache.clear_expired();
    if removed > 0 {
        log::info!("清理过期缓存 {} 条", removed);
    }

    let mut navigation = client.subscribe_navigation();
    tokio::spawn(async move {
        while let Ok(route) = navigation.recv().await {
            log::warn!("登录已失效，需跳转到 {}", route.path());
        }
    });

    let bind_addr = config.bind_addr();
    log::info!("启动量化看板网关，监听 {}，后端 {}", bind_addr, config.api.base_url);

    let tokens = client.tokens().clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(LoginGuard::new(tokens.clone())) // 登录校验
            .wrap(Logger::default()) // 请求日志
            .configure(handlers::config)
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }
    let result = server.bind(bind_addr)?.run().await;
    if let Some(quotes) = quotes {
        quotes.disconnect();
    }
    if let Err(e) = store.flush() {
        log::error!("存储落盘失败: {:#}", e);
    }
    result
}
