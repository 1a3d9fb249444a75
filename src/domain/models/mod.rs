// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 爬取批次（crawl）：一次范围查询请求及其进度统计
/// - 查询结果（cep_result）：每个 (crawl, cep) 唯一的结果记录
/// - 地址记录（cep_record）：查询服务返回的数据
/// - 任务（job）：队列中传递的工作单元
pub mod cep_record;
pub mod cep_result;
pub mod crawl;
pub mod job;
