//! Clerk - Rust 文件问答智能体
//!
//! 模块划分：
//! - **artifact**: 会话文件（CSV 表格 / 图片）与上传解析
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 工具与上传的固定错误集合
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **router**: 查询分类与路由（会话状态机核心）
//! - **session**: 会话模型与注册表
//! - **storage**: 上传文件存储接口（磁盘 / 内存替身）
//! - **sweeper**: 过期会话与文件的后台清扫
//! - **tools**: 能力工具（表格分析、图片文字提取、算术）

pub mod artifact;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod router;
pub mod session;
pub mod storage;
pub mod sweeper;
pub mod tools;
