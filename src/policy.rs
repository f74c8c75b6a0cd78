use std::collections::HashMap;

use tracing::warn;

use crate::{
    auth::{claims::Role, extractors::Session},
    error::AppError,
};

/// Every role-guarded service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateCourse,
    DetailCourse,
    EditCourse,
    DeleteCourse,
    UploadCourseImage,
    CreateStore,
    DetailStore,
    EditStore,
    DeleteStore,
    UploadStoreImage,
    CreateChapter,
    DetailChapter,
    EditChapter,
    DeleteChapter,
    CreateLesson,
    DetailLesson,
    EditLesson,
    DeleteLesson,
}

impl Operation {
    pub const ALL: [Operation; 18] = [
        Operation::CreateCourse,
        Operation::DetailCourse,
        Operation::EditCourse,
        Operation::DeleteCourse,
        Operation::UploadCourseImage,
        Operation::CreateStore,
        Operation::DetailStore,
        Operation::EditStore,
        Operation::DeleteStore,
        Operation::UploadStoreImage,
        Operation::CreateChapter,
        Operation::DetailChapter,
        Operation::EditChapter,
        Operation::DeleteChapter,
        Operation::CreateLesson,
        Operation::DetailLesson,
        Operation::EditLesson,
        Operation::DeleteLesson,
    ];
}

/// Maps each operation to the single role allowed to call it.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    required: HashMap<Operation, Role>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::uniform(Role::Owner)
    }
}

impl RolePolicy {
    pub fn uniform(role: Role) -> Self {
        Self {
            required: Operation::ALL.iter().map(|op| (*op, role)).collect(),
        }
    }

    #[cfg(test)]
    pub fn with(mut self, op: Operation, role: Role) -> Self {
        self.required.insert(op, role);
        self
    }

    pub fn required_role(&self, op: Operation) -> Role {
        self.required.get(&op).copied().unwrap_or(Role::Owner)
    }

    pub fn authorize(&self, op: Operation, session: &Session) -> Result<(), AppError> {
        let required = self.required_role(op);
        if session.claims.role == required {
            return Ok(());
        }
        warn!(
            user_id = %session.claims.sub,
            role = %session.claims.role,
            required = %required,
            ?op,
            "role not allowed"
        );
        Err(AppError::Unauthenticated)
    }
}
