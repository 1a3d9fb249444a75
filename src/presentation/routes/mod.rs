// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::crawl_use_case::CrawlUseCase;
use crate::domain::repositories::cep_result_repository::CepResultRepository;
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::presentation::handlers::crawl_handler;
use crate::queue::job_queue::JobQueue;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `use_case` - 所有 `/cep` 端点共享的爬取用例
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes<C, R, Q>(use_case: Arc<CrawlUseCase<C, R, Q>>) -> Router
where
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
    Q: JobQueue + 'static,
{
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let crawl_routes = Router::new()
        .route("/cep/crawl", post(crawl_handler::create_crawl::<C, R, Q>))
        .route(
            "/cep/crawl/{crawl_id}",
            get(crawl_handler::get_crawl_status::<C, R, Q>),
        )
        .route(
            "/cep/crawl/{crawl_id}/results",
            get(crawl_handler::get_crawl_results::<C, R, Q>),
        )
        .layer(Extension(use_case));

    Router::new()
        .merge(public_routes)
        .merge(crawl_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
