//! Shopper identity.

use secrecy::SecretString;

use super::id::UserId;

/// Who is operating the cart.
///
/// Anonymous shoppers only ever touch the local mirror. Authenticated
/// shoppers prefer the remote store and fall back to the mirror when it is
/// unreachable. The access token is redacted from `Debug` output.
#[derive(Debug, Clone, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated {
        user_id: UserId,
        access_token: SecretString,
    },
}

impl Identity {
    #[must_use]
    pub fn authenticated(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self::Authenticated {
            user_id,
            access_token: SecretString::from(access_token.into()),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    #[must_use]
    pub const fn access_token(&self) -> Option<&SecretString> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { access_token, .. } => Some(access_token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_anonymous() {
        let identity = Identity::default();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.user_id(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let identity = Identity::authenticated(UserId::new(3), "tok_live_abcdef");
        assert_eq!(identity.user_id(), Some(UserId::new(3)));
        assert!(!format!("{identity:?}").contains("tok_live_abcdef"));
    }
}
