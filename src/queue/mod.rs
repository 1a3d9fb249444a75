// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供至少一次投递的任务队列抽象及其数据库、内存两种实现
pub mod database_queue;
pub mod job_queue;
pub mod memory_queue;
