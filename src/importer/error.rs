// ==========================================
// 质检DPU跟踪系统 - 导入模块错误类型
// ==========================================
// 错误分级:
// - 结构性错误: 本次导入整体失败, 不落库（错误字符串列表）
// - 行级异常: 以 warning 收集, 不中断导入
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 结构性错误（整体失败）=====
    #[error("导入结构错误: {}", errors.join("; "))]
    Structural { errors: Vec<String> },

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 导出错误 =====
    #[error("CSV 导出失败: {0}")]
    CsvExportError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 单条结构性错误
    pub fn structural(message: impl Into<String>) -> Self {
        ImportError::Structural {
            errors: vec![message.into()],
        }
    }

    /// 取结构性错误字符串列表（其余错误类型折叠为单条）
    pub fn error_strings(&self) -> Vec<String> {
        match self {
            ImportError::Structural { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
