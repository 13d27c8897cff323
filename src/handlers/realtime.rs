//! 实时行情：WebSocket 推送的订阅管理与 SSE 转发

use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use super::AppState;
use crate::models::ApiResponse;
use crate::services::stock::normalize_code;
use crate::ws::QuoteStream;

const DISABLED_MESSAGE: &str = "实时行情未启用";

#[derive(Debug, Deserialize)]
pub struct CodesBody {
    pub codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodesQuery {
    /// 逗号分隔
    pub codes: String,
}

#[derive(Debug, Serialize)]
pub struct RealtimeStatus {
    pub enabled: bool,
    pub connected: bool,
    pub codes: Vec<String>,
}

fn normalize_all<'a>(codes: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = codes
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(normalize_code)
        .collect();
    out.sort();
    out.dedup();
    out
}

fn disabled() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(DISABLED_MESSAGE.to_string()))
}

fn unavailable(e: anyhow::Error) -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(e.to_string()))
}

/// SSE 连接期间持有的订阅，释放时退订
struct HeldCodes {
    stream: Arc<QuoteStream>,
    codes: Vec<String>,
}

impl Drop for HeldCodes {
    fn drop(&mut self) {
        if let Err(e) = self.stream.unsubscribe(&self.codes) {
            log::debug!("退订实时行情失败: {}", e);
        }
    }
}

pub async fn status(state: web::Data<AppState>) -> Result<HttpResponse> {
    let status = match &state.quotes {
        Some(stream) => RealtimeStatus {
            enabled: true,
            connected: stream.is_connected(),
            codes: stream.subscribed_codes(),
        },
        None => RealtimeStatus {
            enabled: false,
            connected: false,
            codes: Vec::new(),
        },
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(status)))
}

pub async fn subscribe(state: web::Data<AppState>, body: web::Json<CodesBody>) -> Result<HttpResponse> {
    let Some(stream) = &state.quotes else {
        return Ok(disabled());
    };
    let codes = normalize_all(body.codes.iter().map(String::as_str));
    match stream.subscribe(&codes) {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(stream.subscribed_codes()))),
        Err(e) => Ok(unavailable(e)),
    }
}

pub async fn unsubscribe(state: web::Data<AppState>, body: web::Json<CodesBody>) -> Result<HttpResponse> {
    let Some(stream) = &state.quotes else {
        return Ok(disabled());
    };
    let codes = normalize_all(body.codes.iter().map(String::as_str));
    match stream.unsubscribe(&codes) {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(stream.subscribed_codes()))),
        Err(e) => Ok(unavailable(e)),
    }
}

/// 推送指定股票的 `quote` 消息（SSE），连接断开时退订
pub async fn quote_events(
    state: web::Data<AppState>,
    query: web::Query<CodesQuery>,
) -> Result<HttpResponse> {
    let Some(stream) = state.quotes.clone() else {
        return Ok(disabled());
    };
    let codes = normalize_all(query.codes.split(','));
    if codes.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error("请指定股票代码".to_string())));
    }

    // 先订阅消息再通知服务端，避免漏掉第一条推送
    let quotes = stream.on("quote");
    if let Err(e) = stream.subscribe(&codes) {
        return Ok(unavailable(e));
    }
    let held = HeldCodes { stream, codes };

    let events = futures::stream::unfold((held, quotes), |(held, mut quotes)| async move {
        loop {
            let msg = quotes.recv().await?;
            let wanted = msg
                .code
                .as_deref()
                .map(|code| held.codes.contains(&normalize_code(code)))
                .unwrap_or(false);
            if !wanted {
                continue;
            }
            let json = serde_json::to_string(&msg).ok()?;
            let chunk = web::Bytes::from(format!("data: {}\n\n", json));
            return Some((Ok::<_, Infallible>(chunk), (held, quotes)));
        }
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/realtime")
            .route("/status", web::get().to(status))
            .route("/subscribe", web::post().to(subscribe))
            .route("/unsubscribe", web::post().to(unsubscribe))
            .route("/quotes", web::get().to(quote_events)),
    );
}
