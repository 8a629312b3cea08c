//! Standard requester claims.
//!
//! Common identity claim names bundled as one explicitly constructed value.
//! Whoever composes a service builds a [`StandardClaims`] and hands it to the
//! components that need it; nothing is registered globally.

use crate::claim::Claim;

/// Claim name of the subject identifier.
pub const SUB: &str = "sub";
/// Claim name of the human-readable username.
pub const PREFERRED_USERNAME: &str = "preferred_username";
/// Claim name of the email address.
pub const EMAIL: &str = "email";
/// Claim name of the role list.
pub const ROLES: &str = "roles";
/// Claim name of the group list.
pub const GROUPS: &str = "groups";

/// Accessors for the standard requester claims.
#[derive(Debug, Clone)]
pub struct StandardClaims {
    /// Subject identifier (typically a user ID).
    pub sub: Claim<String>,
    /// Human-readable username.
    pub preferred_username: Claim<String>,
    /// Email address.
    pub email: Claim<String>,
    /// Roles assigned to the subject.
    pub roles: Claim<Vec<String>>,
    /// Groups the subject belongs to.
    pub groups: Claim<Vec<String>>,
}

impl StandardClaims {
    /// Accessors for the standard requester claims at their top-level keys.
    ///
    /// ```
    /// use cazi_claims::{Claims, StandardClaims};
    ///
    /// let standard = StandardClaims::new();
    /// let mut claims = Claims::new();
    /// standard.sub.set(&mut claims, "alice".to_owned());
    ///
    /// assert_eq!(standard.sub.get(&claims).as_deref(), Some("alice"));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            sub: Claim::top_level(SUB),
            preferred_username: Claim::top_level(PREFERRED_USERNAME),
            email: Claim::top_level(EMAIL),
            roles: Claim::top_level(ROLES),
            groups: Claim::top_level(GROUPS),
        }
    }
}

impl Default for StandardClaims {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::claim::Claims;

    #[test]
    fn sub_claim() {
        let standard = StandardClaims::new();
        let mut c = Claims::new();
        standard.sub.set(&mut c, "user-123".to_owned());

        assert_eq!(standard.sub.get(&c).as_deref(), Some("user-123"));
    }

    #[test]
    fn preferred_username_and_email_claims() {
        let standard = StandardClaims::new();
        let mut c = Claims::new();
        standard.preferred_username.set(&mut c, "alice".to_owned());
        standard.email.set(&mut c, "user@example.com".to_owned());

        assert_eq!(standard.preferred_username.get(&c).as_deref(), Some("alice"));
        assert_eq!(standard.email.get(&c).as_deref(), Some("user@example.com"));
    }

    #[test]
    fn roles_and_groups_claims() {
        let standard = StandardClaims::new();
        let mut c = Claims::new();
        standard.roles
            .set(&mut c, vec!["admin".to_owned(), "editor".to_owned()]);
        standard.groups
            .set(&mut c, vec!["developers".to_owned(), "ops".to_owned()]);

        assert_eq!(
            standard.roles.get(&c),
            Some(vec!["admin".to_owned(), "editor".to_owned()])
        );
        assert_eq!(
            standard.groups.get(&c),
            Some(vec!["developers".to_owned(), "ops".to_owned()])
        );
    }

    #[test]
    fn claims_bags_are_independent() {
        let standard = StandardClaims::default();
        let mut c1 = Claims::new();
        let mut c2 = Claims::new();

        standard.sub.set(&mut c1, "user-1".to_owned());
        standard.sub.set(&mut c2, "user-2".to_owned());

        assert_eq!(standard.sub.get(&c1).as_deref(), Some("user-1"));
        assert_eq!(standard.sub.get(&c2).as_deref(), Some("user-2"));
    }

    #[test]
    fn roles_read_as_missing_when_stored_as_string() {
        let standard = StandardClaims::new();
        let mut c = Claims::new();
        c.insert(ROLES.to_owned(), serde_json::json!("admin"));

        assert_eq!(standard.roles.get(&c), None);
    }
}
