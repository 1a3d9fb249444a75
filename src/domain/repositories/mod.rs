// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供（sea-orm 与内存两种）。
///
/// 包含的仓库接口：
/// - 爬取批次仓库（crawl_repository）：批次创建、原子计数和条件状态转换
/// - 查询结果仓库（cep_result_repository）：幂等写入和分页查询
pub mod cep_result_repository;
pub mod crawl_repository;

pub use crawl_repository::RepositoryError;
