use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in user on whose behalf an engine call runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn user(id: Uuid) -> Self {
        Self {
            id,
            is_admin: false,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, is_admin: true }
    }
}
