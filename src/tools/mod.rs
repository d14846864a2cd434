//! 能力工具
//!
//! 三个无状态工具实现 Tool trait（name / description / can_handle / execute），
//! 由路由器按固定集合分发，不走开放字符串查表。

pub mod arithmetic;
pub mod tabular;
pub mod vision;

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::error::ToolError;

pub use arithmetic::ArithmeticTool;
pub use tabular::TabularTool;
pub use vision::ImageTextTool;

/// 工具 trait：名称、描述、能否处理、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 该工具能否处理这条查询（配合当前绑定的文件判断）
    fn can_handle(&self, query: &str, artifact: Option<&Artifact>) -> bool;

    /// 执行工具，返回回复文本或固定集合内的错误
    async fn execute(&self, query: &str, artifact: Option<&Artifact>)
        -> Result<String, ToolError>;
}

/// 整数结果也带一位小数（3 -> "3.0"），其余按最短精确表示输出
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
