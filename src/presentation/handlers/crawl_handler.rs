// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::{
    application::{
        dto::crawl_request::{CrawlRequestDto, ResultsQuery},
        use_cases::crawl_use_case::{CrawlUseCase, CrawlUseCaseError},
    },
    domain::repositories::{
        cep_result_repository::CepResultRepository, crawl_repository::CrawlRepository,
    },
    queue::job_queue::JobQueue,
};

fn error_response(status: StatusCode, msg: String) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn use_case_error(err: CrawlUseCaseError) -> Response {
    let (status, msg): (StatusCode, String) = err.into();
    if status.is_server_error() {
        error!("Request failed: {}", msg);
    }
    error_response(status, msg)
}

/// 提交 CEP 范围爬取
pub async fn create_crawl<C, R, Q>(
    Extension(use_case): Extension<Arc<CrawlUseCase<C, R, Q>>>,
    payload: Result<Json<CrawlRequestDto>, JsonRejection>,
) -> impl IntoResponse
where
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
    Q: JobQueue + 'static,
{
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match use_case.submit_crawl(payload).await {
        Ok(response) => (StatusCode::ACCEPTED, Json(response)).into_response(),
        Err(e) => use_case_error(e),
    }
}

/// 获取爬取进度
pub async fn get_crawl_status<C, R, Q>(
    Extension(use_case): Extension<Arc<CrawlUseCase<C, R, Q>>>,
    Path(crawl_id): Path<String>,
) -> impl IntoResponse
where
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
    Q: JobQueue + 'static,
{
    match use_case.get_crawl_status(&crawl_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => use_case_error(e),
    }
}

/// 获取爬取结果
pub async fn get_crawl_results<C, R, Q>(
    Extension(use_case): Extension<Arc<CrawlUseCase<C, R, Q>>>,
    Path(crawl_id): Path<String>,
    query: Result<Query<ResultsQuery>, QueryRejection>,
) -> impl IntoResponse
where
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
    Q: JobQueue + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match use_case.get_crawl_results(&crawl_id, &query).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => use_case_error(e),
    }
}

impl From<CrawlUseCaseError> for (StatusCode, String) {
    fn from(err: CrawlUseCaseError) -> Self {
        match err {
            CrawlUseCaseError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            e @ CrawlUseCaseError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            e @ CrawlUseCaseError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            e @ CrawlUseCaseError::Queue(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}
