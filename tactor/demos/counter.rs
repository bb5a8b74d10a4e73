use anyhow::ensure;
use serde::{Deserialize, Serialize};
use tactor::prelude::*;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    balance: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Ledger {
    Deposited(u64),
    Withdrawn(u64),
}

#[derive(Debug, Tagged)]
#[tagged(rename_all = "snake_case")]
pub enum Teller {
    Deposit(u64),
    Withdraw(u64),
    Balance,
}

#[derive(Debug)]
pub enum Receipt {
    Balance(u64),
    Rejected,
}

pub struct Bank;

impl Transactional for Bank {
    type State = Account;
    type Event = Ledger;
    type Msg = Teller;
    type Reply = Receipt;

    async fn receive(
        &self,
        tx: &mut Transition<Account, Ledger>,
        ctx: &Context<Self>,
        msg: Teller,
    ) -> anyhow::Result<Receipt> {
        let balance = tx.get().balance;

        match msg {
            Teller::Deposit(amount) => {
                tx.set(Account {
                    balance: balance + amount,
                });
                tx.emit(Ledger::Deposited(amount));
            }
            Teller::Withdraw(amount) => {
                ensure!(
                    amount <= balance,
                    "{} cannot withdraw {amount} from {balance}",
                    ctx.persistence_id()
                );

                tx.set(Account {
                    balance: balance - amount,
                });
                tx.emit(Ledger::Withdrawn(amount));
            }
            Teller::Balance => {}
        }

        Ok(Receipt::Balance(tx.get().balance))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,tactor=trace")
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f %Z".into()))
        .init();

    let config = SystemConfig::new("bank");
    let system = ActorSystem::from_config(config)?;

    // Overdrafts are refused without failing the caller
    let supervisor = Recover::new(|failure: Failure| async move {
        if failure.tag == "withdraw" {
            info!("refused: {:#}", failure.error);
            Ok(Receipt::Rejected)
        } else {
            Err(failure.error)
        }
    });

    let account = system.spawn_supervised("account-1", Bank, Account::default(), supervisor)?;

    info!(
        "spawned {} on shard {}",
        account.persistence_id(),
        account.shard()
    );

    for msg in [
        Teller::Deposit(100),
        Teller::Withdraw(30),
        Teller::Withdraw(500),
        Teller::Balance,
    ] {
        let tag = msg.tag();
        let receipt = account.ask(msg).await?;
        info!("{tag}: {receipt:?}");
    }

    let id = account.persistence_id().clone();
    for record in system.storage().events(&id).await? {
        info!("event #{} ({} bytes)", record.sequence, record.event.len());
    }

    account.terminate().await?;

    Ok(())
}
