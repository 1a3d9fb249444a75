// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 范围服务（cep_range）：CEP 区间的校验与展开
/// - 查询服务（lookup_service）：外部查询能力的抽象与错误分类
pub mod cep_range;
pub mod lookup_service;
