// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership checks for user-owned resources.

use crate::auth::AuthenticatedUser;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> u64;

    /// Whether `user` owns this resource.
    fn is_owned_by(&self, user: &AuthenticatedUser) -> bool {
        self.owner_user_id() == user.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserType;

    struct TestResource {
        owner: u64,
    }

    impl OwnedResource for TestResource {
        fn owner_user_id(&self) -> u64 {
            self.owner
        }
    }

    fn make_user(user_id: u64) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id,
            email: format!("user{user_id}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            user_type: UserType::Editor,
        }
    }

    #[test]
    fn owner_passes() {
        let resource = TestResource { owner: 123 };
        assert!(resource.is_owned_by(&make_user(123)));
    }

    #[test]
    fn non_owner_fails() {
        let resource = TestResource { owner: 123 };
        assert!(!resource.is_owned_by(&make_user(456)));
    }
}
