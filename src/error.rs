//! 错误类型
//!
//! 工具执行与上传解析的固定错误集合。路由器将所有工具失败转成带 "Error: " 前缀的
//! 回复文本记入会话历史，不向传输层抛出；解析类错误原样展示（用户可自行修正），
//! 基础设施类错误（凭证缺失、视觉服务不可用）只展示通用提示，细节进日志。

use thiserror::Error;

/// 能力工具执行失败
#[derive(Error, Debug)]
pub enum ToolError {
    /// 会话没有绑定所需类型的文件（含「文件在读取时已被清扫」的情形）
    #[error("no file is loaded for this session")]
    NoArtifactBound,

    #[error("column not found: {0}")]
    UnknownColumn(String),

    #[error("unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    #[error("could not parse an arithmetic expression: {0}")]
    ParseError(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("vision call failed: {0}")]
    VisionCallFailed(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// 查询不匹配任何工具且会话无可用文件
    #[error("no capability can handle this query")]
    NoCapabilityAvailable,
}

impl ToolError {
    /// 是否为基础设施错误：细节不外泄，只回通用提示
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ToolError::VisionCallFailed(_) | ToolError::MissingCredential(_)
        )
    }
}

/// 上传文件解析失败
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported file type: {0} (use PNG, JPEG, or CSV)")]
    UnsupportedFileType(String),

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("invalid CSV file: {0}")]
    InvalidCsv(String),

    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
}
