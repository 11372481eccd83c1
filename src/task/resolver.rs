use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{error::RelayResult, gateway::LedgerGateway};

/// Which stake managers a round works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetResolver {
    /// A single configured stake manager
    Fixed(Pubkey),
    /// Every stake manager entrusted to the stack, re-read each round
    Entrusted { stack: Pubkey },
}

impl TargetResolver {
    pub fn mode(&self) -> &'static str {
        match self {
            TargetResolver::Fixed(_) => "fixed",
            TargetResolver::Entrusted { .. } => "entrusted",
        }
    }

    pub async fn resolve_targets(&self, gateway: &dyn LedgerGateway) -> RelayResult<Vec<Pubkey>> {
        match self {
            TargetResolver::Fixed(stake_manager) => Ok(vec![*stake_manager]),
            TargetResolver::Entrusted { stack } => {
                let view = gateway.get_stack(stack).await?;
                debug!(%stack, count = view.entrusted_stake_managers.len(), "resolved entrusted stake managers");
                Ok(view.entrusted_stake_managers)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use crate::gateway::StackView;

    fn stack_with(gateway: &FakeGateway, members: Vec<Pubkey>) -> Pubkey {
        let stack = Pubkey::new_unique();
        gateway.with_state(|s| {
            s.stacks.insert(
                stack,
                StackView {
                    admin: Pubkey::new_unique(),
                    entrusted_stake_managers: members,
                },
            );
        });
        stack
    }

    #[tokio::test]
    async fn test_fixed_ignores_ledger() {
        let gateway = FakeGateway::new();
        gateway.with_state(|s| s.fail_reads = true);
        let target = Pubkey::new_unique();

        let targets = TargetResolver::Fixed(target).resolve_targets(&gateway).await.unwrap();
        assert_eq!(targets, vec![target]);
    }

    #[tokio::test]
    async fn test_entrusted_empty_list() {
        let gateway = FakeGateway::new();
        let stack = stack_with(&gateway, vec![]);

        let targets = TargetResolver::Entrusted { stack }.resolve_targets(&gateway).await.unwrap();
        assert!(targets.is_empty());
    }

    #[tokio::test]
    async fn test_entrusted_membership_changes_between_rounds() {
        let gateway = FakeGateway::new();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let stack = stack_with(&gateway, vec![a]);
        let resolver = TargetResolver::Entrusted { stack };

        assert_eq!(resolver.resolve_targets(&gateway).await.unwrap(), vec![a]);

        gateway.with_state(|s| s.stacks.get_mut(&stack).unwrap().entrusted_stake_managers = vec![b, a]);
        assert_eq!(resolver.resolve_targets(&gateway).await.unwrap(), vec![b, a]);
    }

    #[tokio::test]
    async fn test_entrusted_missing_stack_fails() {
        let gateway = FakeGateway::new();
        let resolver = TargetResolver::Entrusted { stack: Pubkey::new_unique() };

        let err = resolver.resolve_targets(&gateway).await.unwrap_err();
        assert!(err.is_account_not_found());
    }
}
