// 🎖️ Privilege Entity - Named congregational standing
//
// The name is free text. Its classification tags are computed once, here, at creation,
// so lookups and aggregation never re-match strings.

use crate::privileges::{classify_privilege, PrivilegeTag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub id: String,
    pub name: String,

    /// Every tag whose phrase occurs in `name` (empty for unrecognised privileges)
    pub tags: Vec<PrivilegeTag>,
}

impl Privilege {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Privilege {
            id: uuid::Uuid::new_v4().to_string(),
            tags: classify_privilege(&name),
            name,
        }
    }
}

/// Privilege as attached to a member or publisher (resolved relation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRef {
    pub id: String,
    pub name: String,
    pub tags: Vec<PrivilegeTag>,
}

impl PrivilegeRef {
    pub fn has_tag(&self, tag: PrivilegeTag) -> bool {
        self.tags.contains(&tag)
    }
}

impl From<&Privilege> for PrivilegeRef {
    fn from(privilege: &Privilege) -> Self {
        PrivilegeRef {
            id: privilege.id.clone(),
            name: privilege.name.clone(),
            tags: privilege.tags.clone(),
        }
    }
}
