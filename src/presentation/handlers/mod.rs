// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 每个处理器负责解析请求、调用用例并把结果映射为 HTTP 响应
pub mod crawl_handler;
