//! Operation Context
//!
//! Identifies the acting user for a core operation. The identity provider
//! (outside this crate) authenticates the user and resolves the administrator
//! capability once; the core trusts the boolean and never inspects user
//! records to re-derive it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation: who is acting, and with what capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperationContext {
    /// Acting user
    pub user_id: Uuid,

    /// Administrator capability, resolved by the identity provider
    pub is_admin: bool,
}

impl OperationContext {
    /// Context for a regular customer
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// Context for a bank administrator
    pub fn administrator(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Check whether this context may act on resources owned by `owner_id`
    pub fn can_act_for(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_acts_only_for_self() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ctx = OperationContext::customer(user);

        assert!(ctx.can_act_for(user));
        assert!(!ctx.can_act_for(other));
    }

    #[test]
    fn test_administrator_acts_for_anyone() {
        let admin = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ctx = OperationContext::administrator(admin);

        assert!(ctx.is_admin);
        assert!(ctx.can_act_for(other));
    }
}
