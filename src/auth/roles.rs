// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account type chosen at registration.
///
/// - `Viewer` - reads posts
/// - `Editor` - writes posts
///
/// Both types may create posts; the type is carried in tokens and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Viewer,
    Editor,
}

impl UserType {
    /// Parse a user type (case-insensitive).
    pub fn parse(s: &str) -> Option<UserType> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Some(UserType::Viewer),
            "editor" => Some(UserType::Editor),
            _ => None,
        }
    }
}

impl Default for UserType {
    fn default() -> Self {
        UserType::Viewer
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserType::Viewer => write!(f, "viewer"),
            UserType::Editor => write!(f, "editor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_types() {
        assert_eq!(UserType::parse("viewer"), Some(UserType::Viewer));
        assert_eq!(UserType::parse("EDITOR"), Some(UserType::Editor));
        assert_eq!(UserType::parse("admin"), None);
    }

    #[test]
    fn display_matches_serde() {
        let json = serde_json::to_string(&UserType::Editor).unwrap();
        assert_eq!(json, format!("\"{}\"", UserType::Editor));
    }
}
