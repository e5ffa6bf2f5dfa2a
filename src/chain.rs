//! ERC20 token client.
//!
//! The core talks to the chain through the `BalanceOracle` and
//! `TransferExecutor` traits; `EthTokenClient` is the ethers-backed
//! implementation used in production. Tests substitute mocks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::signers::coins_bip39::English;
use tokio::time::sleep;

use crate::configure::AppConfig;

abigen!(
    Erc20Token,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function transfer(address to, uint256 amount) external returns (bool)
    ]"#
);

/// Account balance lookup, used for admission control only.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn balance_of(&self, account: Address) -> Result<U256>;
}

/// Transfer submission and confirmation.
///
/// `submit` broadcasts a transfer and returns the transaction hash;
/// `confirm` blocks until that transaction reaches a terminal on-chain
/// state. Only the dispatch worker calls these, one transfer at a time.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn submit(&self, account: Address, amount: U256) -> Result<TxHash>;
    async fn confirm(&self, tx_hash: TxHash) -> Result<()>;
}

type TokenMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct EthTokenClient {
    contract: Erc20Token<TokenMiddleware>,
    client: Arc<TokenMiddleware>,
}

impl EthTokenClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .context("invalid rpc_url")?;

        let wallet = MnemonicBuilder::<English>::default()
            .phrase(config.mnemonic.as_str())
            .build()
            .context("invalid mnemonic")?
            .with_chain_id(config.chain_id);

        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        let token_address: Address = config
            .token_address
            .parse()
            .context("invalid token_address")?;
        let contract = Erc20Token::new(token_address, client.clone());

        Ok(Self { contract, client })
    }
}

#[async_trait]
impl BalanceOracle for EthTokenClient {
    async fn balance_of(&self, account: Address) -> Result<U256> {
        let balance = self
            .contract
            .balance_of(account)
            .call()
            .await
            .context("balanceOf call failed")?;
        Ok(balance)
    }
}

#[async_trait]
impl TransferExecutor for EthTokenClient {
    async fn submit(&self, account: Address, amount: U256) -> Result<TxHash> {
        let call = self.contract.transfer(account, amount);
        let pending = call
            .send()
            .await
            .context("transfer submission failed")?;
        Ok(*pending)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<()> {
        // No timeout: the worker waits as long as the chain takes.
        loop {
            match self.client.get_transaction_receipt(tx_hash).await? {
                Some(receipt) => {
                    if receipt.status == Some(1.into()) {
                        return Ok(());
                    }
                    anyhow::bail!("transaction {:?} reverted", tx_hash);
                }
                None => sleep(RECEIPT_POLL_INTERVAL).await,
            }
        }
    }
}
