//! 错误处理模块
//!
//! 定义DTO子系统的统一错误类型

use thiserror::Error;

/// 单个字段的验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// 字段路径，例如 `name`、`items.0.price`，根级错误为 `$`
    pub path: String,
    /// 错误描述
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 在路径前追加父级路径
    pub fn nested(self, parent: &str) -> Self {
        let path = if self.path == "$" {
            parent.to_string()
        } else {
            format!("{}.{}", parent, self.path)
        };
        Self {
            path,
            message: self.message,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// DTO错误类型
#[derive(Error, Debug)]
pub enum DtoError {
    /// 集成方的配置缺陷，在特化阶段或调用阶段立即报告
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 外部数据不符合传输类型的字段约束
    #[error("数据验证失败: {}", format_field_errors(.errors))]
    ValidationError { errors: Vec<FieldError> },

    /// 模型与值映射之间的序列化失败
    #[error("数据序列化失败: {message}")]
    SerializationError { message: String },

    /// 适配器内部错误，原样透传
    #[error(transparent)]
    AdapterError(#[from] anyhow::Error),
}

impl DtoError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, DtoError::ConfigurationError { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DtoError::ValidationError { .. })
    }

    /// 验证错误的字段明细，其他错误返回空切片
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            DtoError::ValidationError { errors } => errors,
            _ => &[],
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// DTO结果类型
pub type DtoResult<T> = Result<T, DtoError>;

/// 便捷宏：构造错误
#[macro_export]
macro_rules! dto_error {
    (config, $msg:expr) => {
        $crate::error::DtoError::ConfigurationError {
            message: $msg.to_string(),
        }
    };
    (validation, $path:expr, $msg:expr) => {
        $crate::error::DtoError::ValidationError {
            errors: vec![$crate::error::FieldError::new($path, $msg)],
        }
    };
    (serialization, $msg:expr) => {
        $crate::error::DtoError::SerializationError {
            message: $msg.to_string(),
        }
    };
}
