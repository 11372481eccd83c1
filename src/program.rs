//! Instruction builders and address derivation for the LSD program.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
};

use crate::gateway::codec::discriminator;

pub const STAKE_POOL_SEED: &[u8] = b"pool_seed";

pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");
pub const STAKE_PROGRAM_ID: Pubkey = pubkey!("Stake11111111111111111111111111111111111111");
pub const STAKE_CONFIG_ID: Pubkey = pubkey!("StakeConfig11111111111111111111111111111111");
pub const CLOCK_SYSVAR_ID: Pubkey = pubkey!("SysvarC1ock11111111111111111111111111111111");
pub const RENT_SYSVAR_ID: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");
pub const STAKE_HISTORY_SYSVAR_ID: Pubkey = pubkey!("SysvarStakeHistory1111111111111111111111111");

/// Instruction data for an argument-less Anchor instruction
pub fn instruction_data(name: &str) -> Vec<u8> {
    discriminator("global", name).to_vec()
}

/// PDA holding the pooled stake authority of a stake manager
pub fn stake_pool_address(program_id: &Pubkey, stake_manager: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[stake_manager.as_ref(), STAKE_POOL_SEED], program_id).0
}

/// PDA collecting stack fees for one LSD token mint
pub fn stack_fee_account_address(program_id: &Pubkey, stack: &Pubkey, lsd_token_mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[stack.as_ref(), lsd_token_mint.as_ref()], program_id).0
}

pub fn fee_recipient_address(owner: &Pubkey, lsd_token_mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, lsd_token_mint)
}

pub fn create_fee_recipient(fee_payer: &Pubkey, owner: &Pubkey, lsd_token_mint: &Pubkey) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account(
        fee_payer,
        owner,
        lsd_token_mint,
        &spl_token::ID,
    )
}

pub fn era_new(program_id: &Pubkey, stake_manager: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new_readonly(CLOCK_SYSVAR_ID, false),
        ],
        data: instruction_data("era_new"),
    }
}

pub fn era_bond(
    program_id: &Pubkey,
    stake_manager: &Pubkey,
    validator: &Pubkey,
    stake_pool: &Pubkey,
    stake_account: &Pubkey,
    fee_payer: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new_readonly(*validator, false),
            AccountMeta::new(*stake_pool, false),
            AccountMeta::new(*stake_account, true),
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(CLOCK_SYSVAR_ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_HISTORY_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_CONFIG_ID, false),
            AccountMeta::new_readonly(STAKE_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data("era_bond"),
    }
}

pub fn era_skip_bond(program_id: &Pubkey, stake_manager: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*stake_manager, false)],
        data: instruction_data("era_skip_bond"),
    }
}

pub fn era_unbond(
    program_id: &Pubkey,
    stake_manager: &Pubkey,
    stake_pool: &Pubkey,
    stake_account: &Pubkey,
    split_stake_account: &Pubkey,
    validator: &Pubkey,
    fee_payer: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new_readonly(*stake_pool, false),
            AccountMeta::new(*stake_account, false),
            AccountMeta::new(*split_stake_account, true),
            AccountMeta::new_readonly(*validator, false),
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(CLOCK_SYSVAR_ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data("era_unbond"),
    }
}

pub fn era_update_active(program_id: &Pubkey, stake_manager: &Pubkey, stake_account: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new_readonly(*stake_account, false),
        ],
        data: instruction_data("era_update_active"),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn era_update_rate(
    program_id: &Pubkey,
    stake_manager: &Pubkey,
    stack: &Pubkey,
    stake_pool: &Pubkey,
    lsd_token_mint: &Pubkey,
    platform_fee_recipient: &Pubkey,
    stack_fee_recipient: &Pubkey,
    stack_fee_account: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new(*stack, false),
            AccountMeta::new_readonly(*stake_pool, false),
            AccountMeta::new(*lsd_token_mint, false),
            AccountMeta::new(*platform_fee_recipient, false),
            AccountMeta::new(*stack_fee_recipient, false),
            AccountMeta::new(*stack_fee_account, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data: instruction_data("era_update_rate"),
    }
}

pub fn era_merge(
    program_id: &Pubkey,
    stake_manager: &Pubkey,
    src_stake_account: &Pubkey,
    dst_stake_account: &Pubkey,
    stake_pool: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new(*src_stake_account, false),
            AccountMeta::new(*dst_stake_account, false),
            AccountMeta::new_readonly(*stake_pool, false),
            AccountMeta::new_readonly(CLOCK_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_HISTORY_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_PROGRAM_ID, false),
        ],
        data: instruction_data("era_merge"),
    }
}

pub fn era_withdraw(
    program_id: &Pubkey,
    stake_manager: &Pubkey,
    stake_pool: &Pubkey,
    stake_account: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_manager, false),
            AccountMeta::new(*stake_pool, false),
            AccountMeta::new(*stake_account, false),
            AccountMeta::new_readonly(CLOCK_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_HISTORY_SYSVAR_ID, false),
            AccountMeta::new_readonly(STAKE_PROGRAM_ID, false),
        ],
        data: instruction_data("era_withdraw"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_pool_address_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let stake_manager = Pubkey::new_unique();
        assert_eq!(
            stake_pool_address(&program_id, &stake_manager),
            stake_pool_address(&program_id, &stake_manager)
        );
        assert_ne!(
            stake_pool_address(&program_id, &stake_manager),
            stake_pool_address(&program_id, &Pubkey::new_unique())
        );
    }

    #[test]
    fn test_instruction_data_is_anchor_discriminator() {
        let data = instruction_data("era_new");
        assert_eq!(data.len(), 8);
        assert_ne!(data, instruction_data("era_bond"));
    }

    #[test]
    fn test_era_bond_signers() {
        let program_id = Pubkey::new_unique();
        let stake_account = Pubkey::new_unique();
        let fee_payer = Pubkey::new_unique();
        let ix = era_bond(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &stake_account,
            &fee_payer,
        );
        let signers: Vec<Pubkey> = ix.accounts.iter().filter(|m| m.is_signer).map(|m| m.pubkey).collect();
        assert_eq!(signers, vec![stake_account, fee_payer]);
    }
}
