// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand dispatch over a SQLite-backed ledger.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use tollgate_config::TollgateConfig;
use tollgate_core::{AccountDraft, AccountId, Identity, LedgerStore, TollgateError};
use tollgate_ledger::{ChargeOutcome, LedgerManager};
use tollgate_storage::SqliteLedgerStore;
use tracing::warn;

use crate::Commands;
use crate::render;

/// Exit code for a request the ledger evaluated and refused.
const REFUSED: u8 = 2;

/// How a command finished, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Done,
    /// A charge or status check came back blocked or short of tokens.
    Refused,
}

/// Open the configured database, run `command`, and close the store.
pub async fn run(
    command: Commands,
    config: &TollgateConfig,
    plain: bool,
) -> Result<ExitCode, TollgateError> {
    let store = Arc::new(SqliteLedgerStore::new(config.storage.clone()));
    let ledger = LedgerManager::open(store, config).await?;
    let result = dispatch(command, &ledger, plain).await;
    let closed = ledger.close().await;
    finish(result, closed)
}

/// Map the command result to an exit code. A command failure wins over a
/// failure to close the store, which is then only logged.
fn finish(
    result: Result<Completion, TollgateError>,
    closed: Result<(), TollgateError>,
) -> Result<ExitCode, TollgateError> {
    let completion = match (result, closed) {
        (Ok(completion), Ok(())) => completion,
        (Ok(_), Err(close_err)) => return Err(close_err),
        (Err(err), Ok(())) => return Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close ledger store");
            return Err(err);
        }
    };
    Ok(match completion {
        Completion::Done => ExitCode::SUCCESS,
        Completion::Refused => ExitCode::from(REFUSED),
    })
}

async fn dispatch<S: LedgerStore>(
    command: Commands,
    ledger: &LedgerManager<S>,
    plain: bool,
) -> Result<Completion, TollgateError> {
    match command {
        Commands::Init => {
            let models = ledger.seed_default_models().await?;
            render::print_json(&models)?;
        }
        Commands::Models => {
            render::print_json(&ledger.models().await?)?;
        }
        Commands::OpenAccount { email, name, admin } => {
            let account = ledger
                .open_account(AccountDraft {
                    email,
                    name,
                    is_admin: admin,
                })
                .await?;
            render::print_json(&account)?;
        }
        Commands::Purchase {
            account,
            tokens,
            price,
        } => {
            let identity = identify(ledger, &account).await?;
            let receipt = ledger.purchase_tokens(&identity, tokens, price).await?;
            render::print_json(&receipt)?;
        }
        Commands::Charge { account, model } => {
            let identity = identify(ledger, &account).await?;
            let outcome = ledger.charge_usage(&identity, &model).await?;
            render::print_json(&outcome)?;
            if !matches!(outcome, ChargeOutcome::Charged(_)) {
                return Ok(Completion::Refused);
            }
        }
        Commands::Status { account } => {
            let identity = identify(ledger, &account).await?;
            let decision = ledger.profit_status(&identity).await?;
            render::print_json(&decision)?;
            if decision.is_blocked() {
                return Ok(Completion::Refused);
            }
        }
        Commands::Report { as_account, json } => {
            let identity = identify(ledger, &as_account).await?;
            let rows = ledger.account_overview(&identity).await?;
            if json {
                render::print_json(&rows)?;
            } else {
                let use_color = !plain && std::io::stdout().is_terminal();
                print!("{}", render::overview_table(&rows, use_color));
            }
        }
    }
    Ok(Completion::Done)
}

/// Resolve an account id into an [`Identity`], taking the admin flag from
/// the stored account.
async fn identify<S: LedgerStore>(
    ledger: &LedgerManager<S>,
    account: &str,
) -> Result<Identity, TollgateError> {
    let id = AccountId::from(account);
    let account = ledger
        .store()
        .account_snapshot(&id)
        .await?
        .ok_or_else(|| TollgateError::account_not_found(id.as_str()))?
        .account;
    Ok(Identity {
        account_id: account.id,
        is_admin: account.is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::MemoryLedgerStore;

    async fn ledger() -> LedgerManager<MemoryLedgerStore> {
        LedgerManager::open(
            Arc::new(MemoryLedgerStore::new()),
            &TollgateConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn identify_reads_admin_flag_from_account() {
        let ledger = ledger().await;
        let admin = ledger
            .open_account(AccountDraft {
                email: "ops@example.com".into(),
                name: None,
                is_admin: true,
            })
            .await
            .unwrap();

        let identity = identify(&ledger, admin.id.as_str()).await.unwrap();
        assert!(identity.is_admin);
        assert_eq!(identity.account_id, admin.id);
    }

    #[tokio::test]
    async fn identify_unknown_account_is_not_found() {
        let ledger = ledger().await;
        let err = identify(&ledger, "nobody").await.unwrap_err();
        assert!(matches!(err, TollgateError::NotFound { entity: "account", .. }));
    }

    #[tokio::test]
    async fn refused_charge_exits_with_refusal_code() {
        let ledger = ledger().await;
        ledger.seed_default_models().await.unwrap();
        let user = ledger
            .open_account(AccountDraft {
                email: "broke@example.com".into(),
                name: None,
                is_admin: false,
            })
            .await
            .unwrap();

        let code = dispatch(
            Commands::Charge {
                account: user.id.0.clone(),
                model: "Ai-podcast".into(),
            },
            &ledger,
            true,
        )
        .await
        .unwrap();
        assert_eq!(code, Completion::Refused);
    }

    fn unavailable(reason: &str) -> TollgateError {
        TollgateError::StoreUnavailable {
            source: reason.to_string().into(),
        }
    }

    #[test]
    fn command_error_wins_over_close_error() {
        let err = finish(
            Err(TollgateError::Validation("bad email".into())),
            Err(unavailable("disk gone")),
        )
        .unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));
    }

    #[test]
    fn close_error_surfaces_after_a_successful_command() {
        let err = finish(Ok(Completion::Done), Err(unavailable("disk gone"))).unwrap_err();
        assert!(matches!(err, TollgateError::StoreUnavailable { .. }));
    }

    #[test]
    fn clean_finish_maps_completion_to_exit_code() {
        assert!(finish(Ok(Completion::Done), Ok(())).is_ok());
        assert!(finish(Ok(Completion::Refused), Ok(())).is_ok());
    }
}
