use crate::models::Tier;

/// Free recomputations per (caller, subject) for unpaid plans
pub const DEFAULT_FREE_REMATCHES: u32 = 1;

/// Rematch allowance by plan
#[derive(Debug, Clone, Copy)]
pub struct RematchPolicy {
    pub free_allowance: u32,
}

impl Default for RematchPolicy {
    fn default() -> Self {
        Self {
            free_allowance: DEFAULT_FREE_REMATCHES,
        }
    }
}

impl RematchPolicy {
    pub fn new(free_allowance: u32) -> Self {
        Self { free_allowance }
    }

    /// Lifetime allowance for a tier, `None` for unlimited
    pub fn allowance(&self, tier: Tier) -> Option<u32> {
        if tier.is_paid() {
            None
        } else {
            Some(self.free_allowance)
        }
    }

    pub fn can_rematch(&self, tier: Tier, used: u32) -> bool {
        self.allowance(tier).map_or(true, |allowed| used < allowed)
    }

    pub fn remaining(&self, tier: Tier, used: u32) -> Option<u32> {
        self.allowance(tier).map(|allowed| allowed.saturating_sub(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_gets_one_rematch() {
        let policy = RematchPolicy::default();
        assert!(policy.can_rematch(Tier::Free, 0));
        assert!(!policy.can_rematch(Tier::Free, 1));
        assert_eq!(policy.remaining(Tier::Free, 0), Some(1));
        assert_eq!(policy.remaining(Tier::Free, 5), Some(0));
    }

    #[test]
    fn test_paid_tiers_are_unlimited() {
        let policy = RematchPolicy::default();
        for tier in [Tier::Pro, Tier::Elite] {
            assert!(policy.can_rematch(tier, 1_000));
            assert_eq!(policy.remaining(tier, 1_000), None);
        }
    }

    #[test]
    fn test_configurable_allowance() {
        let policy = RematchPolicy::new(3);
        assert!(policy.can_rematch(Tier::Free, 2));
        assert!(!policy.can_rematch(Tier::Free, 3));
    }
}
