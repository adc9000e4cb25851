// 👥 Group Entity - Organizational subdivision of members

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}
