//! The acting user of a mutation.
//!
//! Authentication and role assignment live outside the engine; callers pass
//! the resolved [`Actor`] and the engine enforces field- and operation-level
//! restrictions against it.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Employee,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }

    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl TryFrom<&str> for ActorRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Admin,
        }
    }

    pub fn employee(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Employee,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    pub(crate) fn require_privileged(&self, action: &str) -> ResultEngine<()> {
        if !self.is_privileged() {
            return Err(EngineError::Forbidden(format!("{action} requires admin")));
        }
        Ok(())
    }
}
