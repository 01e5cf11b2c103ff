//! Standard admission gates

use crate::blacklist::BlacklistStore;
use crate::denial::Denial;
use crate::gate::{Gate, GateError, GateInput, Verdict};
use crate::staff::StaffAllowlist;
use std::sync::Arc;
use ticket_model::InvocationKind;

/// Denies invocations from blacklisted guilds
#[derive(Debug, Clone)]
pub struct GuildBlacklistGate {
    store: Arc<BlacklistStore>,
}

impl GuildBlacklistGate {
    /// Gate over `store`
    #[must_use]
    pub fn new(store: Arc<BlacklistStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Gate for GuildBlacklistGate {
    fn name(&self) -> &'static str {
        "guild_blacklist"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        let Some(guild_id) = input.guild_id else {
            return Ok(Verdict::Allow);
        };
        let blacklisted = self.store.is_guild_blacklisted(guild_id).await?;
        Ok(Verdict::require(!blacklisted, Denial::GuildBlacklisted))
    }
}

/// Resolved permission level must meet the required level
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionLevelGate;

#[async_trait::async_trait]
impl Gate for PermissionLevelGate {
    fn name(&self) -> &'static str {
        "permission_level"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        let required = input.descriptor.permission_level;
        Ok(Verdict::require(
            input.facts.permission_level >= required,
            Denial::PermissionDenied { required },
        ))
    }
}

/// Admin-only commands require the bot-admin allowlist
#[derive(Debug, Clone)]
pub struct AdminOnlyGate {
    staff: Arc<StaffAllowlist>,
}

impl AdminOnlyGate {
    /// Gate over `staff`
    #[must_use]
    pub fn new(staff: Arc<StaffAllowlist>) -> Self {
        Self { staff }
    }
}

#[async_trait::async_trait]
impl Gate for AdminOnlyGate {
    fn name(&self) -> &'static str {
        "admin_only"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        Ok(Verdict::require(
            !input.descriptor.admin_only || self.staff.is_admin(input.user_id),
            Denial::AdminOnly,
        ))
    }
}

/// Helper-only commands require the helper allowlist
#[derive(Debug, Clone)]
pub struct HelperOnlyGate {
    staff: Arc<StaffAllowlist>,
}

impl HelperOnlyGate {
    /// Gate over `staff`
    #[must_use]
    pub fn new(staff: Arc<StaffAllowlist>) -> Self {
        Self { staff }
    }
}

#[async_trait::async_trait]
impl Gate for HelperOnlyGate {
    fn name(&self) -> &'static str {
        "helper_only"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        Ok(Verdict::require(
            !input.descriptor.helper_only || self.staff.is_helper(input.user_id),
            Denial::HelperOnly,
        ))
    }
}

/// Premium-only commands require a paid tier
#[derive(Debug, Clone, Copy, Default)]
pub struct PremiumOnlyGate;

#[async_trait::async_trait]
impl Gate for PremiumOnlyGate {
    fn name(&self) -> &'static str {
        "premium_only"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        Ok(Verdict::require(
            !input.descriptor.premium_only || input.facts.premium_tier.is_premium(),
            Denial::PremiumRequired,
        ))
    }
}

/// Denies blacklisted actors unless the command ignores the blacklist
///
/// The global user blacklist always applies. A guild's own member
/// blacklist is not applied to guild staff.
#[derive(Debug, Clone)]
pub struct UserBlacklistGate {
    store: Arc<BlacklistStore>,
}

impl UserBlacklistGate {
    /// Gate over `store`
    #[must_use]
    pub fn new(store: Arc<BlacklistStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Gate for UserBlacklistGate {
    fn name(&self) -> &'static str {
        "user_blacklist"
    }

    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        if input.descriptor.ignore_blacklist {
            return Ok(Verdict::Allow);
        }

        if self.store.is_user_blacklisted(input.user_id).await? {
            return Ok(Verdict::Deny(Denial::UserBlacklisted));
        }

        match (input.kind, input.guild_id) {
            (InvocationKind::Guild, Some(guild_id)) if !input.facts.permission_level.is_staff() => {
                let blacklisted = self
                    .store
                    .is_member_blacklisted(guild_id, input.user_id, input.roles)
                    .await?;
                Ok(Verdict::require(!blacklisted, Denial::MemberBlacklisted))
            }
            _ => Ok(Verdict::Allow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blacklist::{BlacklistRecord, BlacklistRepository, InMemoryBlacklistRepository};
    use ticket_command::CommandDescriptor;
    use ticket_model::{
        AuthorizationFacts, GuildId, PermissionLevel, PremiumTier, RoleId, UserId,
    };

    fn input(descriptor: &CommandDescriptor, facts: AuthorizationFacts) -> GateInput<'_> {
        GateInput {
            descriptor,
            facts,
            kind: InvocationKind::Guild,
            guild_id: Some(GuildId(1)),
            user_id: UserId(7),
            roles: &[],
        }
    }

    fn store(repo: InMemoryBlacklistRepository) -> Arc<BlacklistStore> {
        Arc::new(BlacklistStore::new(Arc::new(repo), 16))
    }

    #[tokio::test]
    async fn permission_gate() {
        let desc = CommandDescriptor::new("close", "").permission(PermissionLevel::Support);
        let low = input(&desc, AuthorizationFacts::default());
        assert_eq!(
            PermissionLevelGate.check(&low).await.unwrap(),
            Verdict::Deny(Denial::PermissionDenied {
                required: PermissionLevel::Support
            })
        );

        let high = input(
            &desc,
            AuthorizationFacts::new(PermissionLevel::Admin, PremiumTier::None),
        );
        assert!(PermissionLevelGate.check(&high).await.unwrap().is_allow());
    }

    #[tokio::test]
    async fn admin_and_helper_gates() {
        let staff = Arc::new(StaffAllowlist::new([UserId(1)], [UserId(7)]));
        let admin_desc = CommandDescriptor::new("blacklist", "").admin_only();
        let helper_desc = CommandDescriptor::new("debug", "").helper_only();

        let admin = AdminOnlyGate::new(Arc::clone(&staff));
        let helper = HelperOnlyGate::new(staff);

        let as_admin_cmd = input(&admin_desc, AuthorizationFacts::default());
        assert_eq!(
            admin.check(&as_admin_cmd).await.unwrap(),
            Verdict::Deny(Denial::AdminOnly)
        );
        let as_helper_cmd = input(&helper_desc, AuthorizationFacts::default());
        assert!(helper.check(&as_helper_cmd).await.unwrap().is_allow());
    }

    #[tokio::test]
    async fn premium_gate() {
        let desc = CommandDescriptor::new("autoclose", "").premium_only();
        let free = input(&desc, AuthorizationFacts::default());
        assert_eq!(
            PremiumOnlyGate.check(&free).await.unwrap(),
            Verdict::Deny(Denial::PremiumRequired)
        );
        let paid = input(
            &desc,
            AuthorizationFacts::new(PermissionLevel::Everyone, PremiumTier::Premium),
        );
        assert!(PremiumOnlyGate.check(&paid).await.unwrap().is_allow());
    }

    #[tokio::test]
    async fn guild_blacklist_gate() {
        let repo = InMemoryBlacklistRepository::new();
        repo.put_guild(GuildId(1), BlacklistRecord::default())
            .await
            .unwrap();
        let gate = GuildBlacklistGate::new(store(repo));
        let desc = CommandDescriptor::new("open", "");

        assert_eq!(
            gate.check(&input(&desc, AuthorizationFacts::default()))
                .await
                .unwrap(),
            Verdict::Deny(Denial::GuildBlacklisted)
        );
    }

    #[tokio::test]
    async fn global_user_blacklist_beats_staff() {
        let repo = Arc::new(InMemoryBlacklistRepository::new());
        let store = Arc::new(BlacklistStore::new(repo, 16));
        store
            .add_user(UserId(7), BlacklistRecord::with_reason("abuse"))
            .await
            .unwrap();

        let gate = UserBlacklistGate::new(store);
        let desc = CommandDescriptor::new("open", "");
        let staff_facts = AuthorizationFacts::new(PermissionLevel::Admin, PremiumTier::None);
        assert_eq!(
            gate.check(&input(&desc, staff_facts)).await.unwrap(),
            Verdict::Deny(Denial::UserBlacklisted)
        );
    }

    #[tokio::test]
    async fn member_blacklist_skips_staff_and_ignoring_commands() {
        let repo = InMemoryBlacklistRepository::new();
        repo.add_role(GuildId(1), RoleId(50));
        let gate = UserBlacklistGate::new(store(repo));

        let desc = CommandDescriptor::new("open", "");
        let mut everyone = input(&desc, AuthorizationFacts::default());
        everyone.roles = &[RoleId(50)];
        assert_eq!(
            gate.check(&everyone).await.unwrap(),
            Verdict::Deny(Denial::MemberBlacklisted)
        );

        let mut staff = everyone;
        staff.facts = AuthorizationFacts::new(PermissionLevel::Support, PremiumTier::None);
        assert!(gate.check(&staff).await.unwrap().is_allow());

        let ignoring = CommandDescriptor::new("help", "").ignore_blacklist();
        let mut ignored = input(&ignoring, AuthorizationFacts::default());
        ignored.roles = &[RoleId(50)];
        assert!(gate.check(&ignored).await.unwrap().is_allow());
    }
}
