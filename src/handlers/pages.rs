//! 页面接口：一次返回整页所需的数据与图表配置

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use std::convert::Infallible;

use super::{error_response, AppState};
use crate::charts::{ActiveIndicator, KLineChartState};
use crate::client::ApiError;
use crate::models::{ApiResponse, BacktestResult};
use crate::pages::kline_dashboard::DashboardQuery;
use crate::pages::stock_detail::QUOTE_POLL_INTERVAL;
use crate::pages::{BacktestReportPage, KLineDashboard, QuotePoller, StockDetailPage};

#[derive(Debug, Deserialize)]
pub struct StockPageQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub indicator: ActiveIndicator,
    #[serde(default = "default_true")]
    pub show_volume: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ReportPageQuery {
    #[serde(default)]
    pub show_trend_numbers: bool,
}

pub async fn stock_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<StockPageQuery>,
) -> Result<HttpResponse> {
    let chart = KLineChartState {
        show_volume: query.show_volume,
        active_indicator: query.indicator,
        ..Default::default()
    };
    let page = StockDetailPage::new(&state.services);
    let view = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => page.load_range(&path, start, end, chart).await,
        _ => page.load(&path, chart).await,
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

/// 行情推送（SSE），连接断开时停止轮询
pub async fn quote_events(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let poller = QuotePoller::start(state.services.market.clone(), &path, QUOTE_POLL_INTERVAL);
    let rx = poller.subscribe();

    let events = futures::stream::unfold((poller, rx), |(poller, mut rx)| async move {
        rx.changed().await.ok()?;
        let json = serde_json::to_string(&*rx.borrow_and_update()).ok()?;
        let chunk = web::Bytes::from(format!("data: {}\n\n", json));
        Some((Ok::<_, Infallible>(chunk), (poller, rx)))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events))
}

pub async fn kline_dashboard(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse> {
    let view = KLineDashboard::new(&state.services).load(&path, &query).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

/// 由请求体中的回测结果生成报告页
pub async fn backtest_report(
    body: web::Json<BacktestResult>,
    query: web::Query<ReportPageQuery>,
) -> Result<HttpResponse> {
    let view = BacktestReportPage::build(&body, query.show_trend_numbers);
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

/// 由最近一次回测的草稿生成报告页
pub async fn backtest_report_draft(
    state: web::Data<AppState>,
    query: web::Query<ReportPageQuery>,
) -> Result<HttpResponse> {
    match state.services.reports.load_draft() {
        Some(result) => {
            let view = BacktestReportPage::build(&result, query.show_trend_numbers);
            Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
        }
        None => Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error("暂无回测结果".to_string()))),
    }
}

/// 由已保存的报告文件生成报告页
pub async fn backtest_report_saved(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ReportPageQuery>,
) -> Result<HttpResponse> {
    let report = match state.services.reports.load(&path).await {
        Ok(report) => report,
        Err(e) => return Ok(error_response(&e)),
    };
    match serde_json::from_value::<BacktestResult>(report.data) {
        Ok(result) => {
            let view = BacktestReportPage::build(&result, query.show_trend_numbers);
            Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
        }
        Err(e) => Ok(error_response(&ApiError::Decode(e.to_string()))),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pages")
            .route("/stock/{code}", web::get().to(stock_detail))
            .route("/stock/{code}/quotes", web::get().to(quote_events))
            .route("/kline/{code}", web::get().to(kline_dashboard))
            .route("/backtest-report", web::post().to(backtest_report))
            .route("/backtest-report", web::get().to(backtest_report_draft))
            .route("/backtest-report/{filename}", web::get().to(backtest_report_saved)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::spawn_backend;
    use crate::handlers::test_support;
    use actix_web::body::MessageBody;
    use actix_web::{test, App};
    use std::pin::Pin;
    use std::time::Duration;

    /// 行情推送的第一条事件是成功的行情
    #[actix_web::test]
    async fn test_quote_events() {
        println!("\n========== 测试行情推送接口 ==========");
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/market/quote/{code}",
                web::get().to(|path: web::Path<String>| async move {
                    HttpResponse::Ok().json(serde_json::json!({
                        "stock_code": path.into_inner(), "price": 9.99
                    }))
                }),
            );
        });
        let (state, _store) = test_support::state(base_url);
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get().uri("/pages/stock/000001/quotes").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let mut body = resp.into_body();
        let chunk = tokio::time::timeout(
            Duration::from_secs(5),
            std::future::poll_fn(|cx| Pin::new(&mut body).poll_next(cx)),
        )
        .await
        .unwrap()
        .unwrap()
        .unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();
        assert!(text.starts_with("data: "));
        let event: serde_json::Value = serde_json::from_str(text["data: ".len()..].trim()).unwrap();
        assert_eq!(event["state"], "success");
        assert_eq!(event["value"]["price"], 9.99);

        drop(body);
        handle.stop(true).await;
        println!("✅ 行情推送接口测试通过！");
    }

    #[actix_web::test]
    async fn test_report_page_without_draft() {
        let (state, _store) = test_support::state("http://127.0.0.1:9/api/v1".into());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;
        let req = test::TestRequest::get().uri("/pages/backtest-report").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
