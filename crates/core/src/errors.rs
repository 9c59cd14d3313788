use thiserror::Error;

/// 流水线错误类型定义
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("认证失败: {0}")]
    Authentication(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("远程请求失败: {path} (HTTP {status:?}): {message}")]
    Remote {
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("分片索引越界: index={index}, shards={shards}")]
    ShardIndexOutOfRange { index: usize, shards: usize },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl PipelineError {
    /// 配置或认证类错误，进程应以非零退出码立即结束
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_)
                | PipelineError::Authentication(_)
                | PipelineError::ShardIndexOutOfRange { .. }
        )
    }

    /// 远程资源确实不存在，调用方应视为"没有数据"
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::NotFound(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(PipelineError::Configuration("missing token".into()).is_configuration());
        assert!(PipelineError::Authentication("bad key".into()).is_configuration());
        assert!(PipelineError::ShardIndexOutOfRange { index: 4, shards: 2 }.is_configuration());
        assert!(!PipelineError::NotFound("/workflow/x".into()).is_configuration());
        assert!(!PipelineError::Internal("boom".into()).is_configuration());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(PipelineError::NotFound("/job/1".into()).is_not_found());
        let remote = PipelineError::Remote {
            path: "/job/1".into(),
            status: Some(500),
            message: "server error".into(),
        };
        assert!(!remote.is_not_found());
        assert!(remote.to_string().contains("/job/1"));
    }
}
