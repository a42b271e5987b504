//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{RegistryError, RepositoryError};
use crate::domain::machine::MachineError;
use crate::domain::queue::QueueError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 当前状态未定义该事件
    #[error("Invalid transition: event {event} is not allowed in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    /// 守卫条件不成立
    #[error("Guard {guard} rejected event {event}")]
    GuardRejected {
        guard: &'static str,
        event: &'static str,
    },

    /// 迁移合法但持久化失败，不能视为已提交
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// 场次已结束或不接受点歌
    #[error("Session {0} is not accepting requests")]
    SessionClosed(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 仓储错误（读取）
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

impl From<MachineError> for ApplicationError {
    fn from(err: MachineError) -> Self {
        match err {
            MachineError::InvalidTransition { state, event } => {
                Self::InvalidTransition { state, event }
            }
            MachineError::GuardRejected { guard, event } => Self::GuardRejected { guard, event },
        }
    }
}

impl From<QueueError> for ApplicationError {
    fn from(err: QueueError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<RegistryError> for ApplicationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { kind, id } => Self::NotFound {
                resource_type: match kind {
                    crate::domain::EntityKind::Song => "Song",
                    crate::domain::EntityKind::Session => "Session",
                },
                id,
            },
            RegistryError::Rejected(e) => e.into(),
            RegistryError::Persistence(e) => Self::PersistenceError(e.to_string()),
            RegistryError::Storage(e) => Self::RepositoryError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;

    #[test]
    fn test_registry_errors_keep_their_kind() {
        let err: ApplicationError = RegistryError::Rejected(MachineError::guard("isNextInQueue", "PLAY")).into();
        assert!(matches!(
            err,
            ApplicationError::GuardRejected { guard: "isNextInQueue", event: "PLAY" }
        ));

        let err: ApplicationError =
            RegistryError::Persistence(RepositoryError::DatabaseError("disk full".into())).into();
        assert!(matches!(err, ApplicationError::PersistenceError(_)));

        let err: ApplicationError = RegistryError::not_found(EntityKind::Session, "ABCD").into();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Session", .. }));
    }
}
