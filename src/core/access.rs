//! Access policy: subscription state → access tier, and tier comparison.
//!
//! Pure and total — no I/O, no error cases. Everything that is not an
//! exact `"premium"` subscription resolves to the free tier, so unknown
//! or absent subscription state never grants elevated access.

use serde::{Deserialize, Serialize};

/// The caller's computed access level.
///
/// `Premium` can read both free- and premium-tiered items; `Free` can read
/// only free-tiered items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Free,
    Premium,
}

impl AccessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessTier::Free => "free",
            AccessTier::Premium => "premium",
        }
    }

    /// Parse a stored tier value. Values are written exclusively through
    /// this enum, so anything unrecognized is treated the fail-safe way:
    /// as `Premium`, i.e. hidden from free callers rather than exposed.
    pub fn from_db(value: &str) -> AccessTier {
        match value {
            "free" => AccessTier::Free,
            _ => AccessTier::Premium,
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a user's subscription state to an access tier.
///
/// Only the exact `"premium"` marker grants the premium tier; any other
/// value, and absent state, resolves to `Free`.
pub fn resolve_tier(subscription_state: Option<&str>) -> AccessTier {
    match subscription_state {
        Some("premium") => AccessTier::Premium,
        _ => AccessTier::Free,
    }
}

/// Whether a caller at `tier` may see an item at `item_tier`.
///
/// True iff the item is free or the caller is premium. Activity flags are
/// filtered upstream, not here.
pub fn can_view(tier: AccessTier, item_tier: AccessTier) -> bool {
    item_tier == AccessTier::Free || tier == AccessTier::Premium
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tier_exact_premium_only() {
        assert_eq!(resolve_tier(Some("premium")), AccessTier::Premium);
        assert_eq!(resolve_tier(Some("free")), AccessTier::Free);
        assert_eq!(resolve_tier(Some("PREMIUM")), AccessTier::Free);
        assert_eq!(resolve_tier(Some("vip")), AccessTier::Free);
        assert_eq!(resolve_tier(Some("")), AccessTier::Free);
        assert_eq!(resolve_tier(None), AccessTier::Free);
    }

    #[test]
    fn test_can_view_matrix() {
        assert!(can_view(AccessTier::Free, AccessTier::Free));
        assert!(!can_view(AccessTier::Free, AccessTier::Premium));
        assert!(can_view(AccessTier::Premium, AccessTier::Free));
        assert!(can_view(AccessTier::Premium, AccessTier::Premium));
    }

    #[test]
    fn test_free_filter_equivalent_to_can_view() {
        // The store realizes the free tier as `access_tier == free` exactly;
        // prove that equals the policy predicate for every combination.
        for item_tier in [AccessTier::Free, AccessTier::Premium] {
            assert_eq!(
                can_view(AccessTier::Free, item_tier),
                item_tier == AccessTier::Free
            );
            assert!(can_view(AccessTier::Premium, item_tier));
        }
    }

    #[test]
    fn test_from_db_unknown_hides_rather_than_exposes() {
        assert_eq!(AccessTier::from_db("free"), AccessTier::Free);
        assert_eq!(AccessTier::from_db("premium"), AccessTier::Premium);
        assert_eq!(AccessTier::from_db("garbage"), AccessTier::Premium);
    }
}
