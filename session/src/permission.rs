use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named capability checked by views and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "can_manage_users")]
    ManageUsers,
    #[serde(rename = "can_manage_settings")]
    ManageSettings,
    #[serde(rename = "can_view_analytics")]
    ViewAnalytics,
    #[serde(rename = "can_publish_content")]
    PublishContent,
    #[serde(rename = "can_edit_content")]
    EditContent,
    #[serde(rename = "can_manage_media")]
    ManageMedia,
    #[serde(rename = "can_view_dashboard")]
    ViewDashboard,
    #[serde(rename = "can_edit_profile")]
    EditProfile,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::ManageUsers,
        Permission::ManageSettings,
        Permission::ViewAnalytics,
        Permission::PublishContent,
        Permission::EditContent,
        Permission::ManageMedia,
        Permission::ViewDashboard,
        Permission::EditProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "can_manage_users",
            Permission::ManageSettings => "can_manage_settings",
            Permission::ViewAnalytics => "can_view_analytics",
            Permission::PublishContent => "can_publish_content",
            Permission::EditContent => "can_edit_content",
            Permission::ManageMedia => "can_manage_media",
            Permission::ViewDashboard => "can_view_dashboard",
            Permission::EditProfile => "can_edit_profile",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| SessionError::UnknownPermission(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
            assert_eq!(serde_json::to_value(p).unwrap(), serde_json::json!(p.as_str()));
        }
        assert!("can_fly".parse::<Permission>().is_err());
    }
}
