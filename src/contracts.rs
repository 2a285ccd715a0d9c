//! Typed, read only access to the Q protocol contracts.
use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_primitives::{address, Address, Bytes, U256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mockall::automock;
use tracing::trace;

use crate::{
    abi::ContractAbis,
    execution_node::ExecutionNodeHttp,
    units::WeiNewtype,
};

pub const Q_CONTRACT_ADDRESS: Address = address!("0xB09da56fa0f59E6a6Ea7C851AD30956351B0BB7D");
pub const Q_ERC20_ADDRESS: Address = address!("0xACA40632C51C2a03209D2714b88Aa0f1456A2101");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contract {
    QContract,
    QErc20,
}

impl Contract {
    pub fn address(&self) -> Address {
        match self {
            Contract::QContract => Q_CONTRACT_ADDRESS,
            Contract::QErc20 => Q_ERC20_ADDRESS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Contract::QContract => "QContract",
            Contract::QErc20 => "QERC20",
        }
    }

    pub fn abi_file_name(&self) -> String {
        format!("{}.json", self.name())
    }
}

#[automock]
#[async_trait]
pub trait QReader: Send + Sync {
    async fn current_cycle(&self) -> Result<u64>;
    async fn cycle_accrued_fees(&self, cycle: u64) -> Result<WeiNewtype>;
    async fn reward_per_cycle(&self, cycle: u64) -> Result<WeiNewtype>;
    /// Batch entries in a cycle, scaled by 100.
    async fn cycle_total_entries(&self, cycle: u64) -> Result<u64>;
    async fn native_burned_per_cycle(&self, cycle: u64) -> Result<WeiNewtype>;
    async fn summed_cycle_stakes(&self, cycle: u64) -> Result<WeiNewtype>;
    async fn total_supply(&self) -> Result<WeiNewtype>;
    async fn balance_of(&self, account: Address) -> Result<WeiNewtype>;
}

pub struct QContractsHttp {
    abis: ContractAbis,
    node: ExecutionNodeHttp,
}

impl QContractsHttp {
    pub fn new(node: ExecutionNodeHttp, abis: ContractAbis) -> Self {
        Self { abis, node }
    }

    async fn read_uint(
        &self,
        contract: Contract,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<U256> {
        let function = self.abis.function(contract, function_name)?;
        let call = || format!("{}.{function_name}", contract.name());

        let data = Bytes::from(
            function
                .abi_encode_input(args)
                .with_context(|| format!("failed to encode call to {}", call()))?,
        );
        trace!(contract = contract.name(), function = function_name, %data, "eth_call");

        let return_data = self
            .node
            .eth_call(contract.address(), data)
            .await
            .with_context(|| format!("failed to call {}", call()))?;

        let outputs = function
            .abi_decode_output(&return_data[..])
            .with_context(|| format!("failed to decode {} return data", call()))?;
        match outputs.first().and_then(DynSolValue::as_uint) {
            Some((value, _bits)) => Ok(value),
            None => Err(anyhow!("{} did not return an unsigned integer", call())),
        }
    }

    async fn read_wei(
        &self,
        contract: Contract,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<WeiNewtype> {
        let value = self.read_uint(contract, function, args).await?;
        WeiNewtype::try_from(value).with_context(|| {
            format!("{}.{function} returned an unexpected amount", contract.name())
        })
    }

    async fn read_u64(
        &self,
        contract: Contract,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<u64> {
        let value = self.read_uint(contract, function, args).await?;
        u64::try_from(value).map_err(|_| {
            anyhow!(
                "{}.{function} returned {value}, which does not fit in u64",
                contract.name()
            )
        })
    }
}

fn cycle_arg(cycle: u64) -> [DynSolValue; 1] {
    [DynSolValue::Uint(U256::from(cycle), 256)]
}

#[async_trait]
impl QReader for QContractsHttp {
    async fn current_cycle(&self) -> Result<u64> {
        self.read_u64(Contract::QContract, "currentCycle", &[]).await
    }

    async fn cycle_accrued_fees(&self, cycle: u64) -> Result<WeiNewtype> {
        self.read_wei(Contract::QContract, "cycleAccruedFees", &cycle_arg(cycle))
            .await
    }

    async fn reward_per_cycle(&self, cycle: u64) -> Result<WeiNewtype> {
        self.read_wei(Contract::QContract, "rewardPerCycle", &cycle_arg(cycle))
            .await
    }

    async fn cycle_total_entries(&self, cycle: u64) -> Result<u64> {
        self.read_u64(Contract::QContract, "cycleTotalEntries", &cycle_arg(cycle))
            .await
    }

    async fn native_burned_per_cycle(&self, cycle: u64) -> Result<WeiNewtype> {
        self.read_wei(Contract::QContract, "nativeBurnedPerCycle", &cycle_arg(cycle))
            .await
    }

    async fn summed_cycle_stakes(&self, cycle: u64) -> Result<WeiNewtype> {
        self.read_wei(Contract::QContract, "summedCycleStakes", &cycle_arg(cycle))
            .await
    }

    async fn total_supply(&self) -> Result<WeiNewtype> {
        self.read_wei(Contract::QErc20, "totalSupply", &[]).await
    }

    async fn balance_of(&self, account: Address) -> Result<WeiNewtype> {
        self.read_wei(Contract::QErc20, "balanceOf", &[DynSolValue::Address(account)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use alloy_primitives::hex;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    use super::*;

    fn abis() -> ContractAbis {
        ContractAbis::load(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("abis")).unwrap()
    }

    async fn mock_result(server: &mut ServerGuard, body: Matcher, result: String) {
        server
            .mock("POST", "/")
            .match_body(body)
            .with_status(200)
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await;
    }

    fn uint_word(value: U256) -> String {
        hex::encode_prefixed(DynSolValue::Uint(value, 256).abi_encode())
    }

    fn contracts_with(server: &ServerGuard) -> QContractsHttp {
        QContractsHttp::new(ExecutionNodeHttp::new(&server.url()), abis())
    }

    #[tokio::test]
    async fn current_cycle_test() {
        let mut server = Server::new_async().await;
        let selector = abis()
            .function(Contract::QContract, "currentCycle")
            .unwrap()
            .selector();
        let selector = hex::encode_prefixed(selector);
        mock_result(
            &mut server,
            Matcher::Regex(format!("\"{selector}\"")),
            uint_word(U256::from(7)),
        )
        .await;

        let contracts = contracts_with(&server);
        assert_eq!(contracts.current_cycle().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn cycle_arg_is_encoded_as_uint256_test() {
        let mut server = Server::new_async().await;
        let selector = abis()
            .function(Contract::QContract, "summedCycleStakes")
            .unwrap()
            .selector();
        let cycle_word = format!("{:0>64}", "2a");
        mock_result(
            &mut server,
            Matcher::Regex(format!("\"{selector}{cycle_word}\"")),
            uint_word(U256::from(5_000_000_000_000_000_000u128)),
        )
        .await;

        let contracts = contracts_with(&server);
        assert_eq!(
            contracts.summed_cycle_stakes(42).await.unwrap(),
            WeiNewtype::from_eth(5)
        );
    }

    #[tokio::test]
    async fn balance_of_encodes_address_test() {
        let mut server = Server::new_async().await;
        mock_result(
            &mut server,
            Matcher::Regex(format!("{:0>64}\"", "dead")),
            uint_word(U256::from(50_000_000_000_000_000_000u128)),
        )
        .await;

        let contracts = contracts_with(&server);
        let burned = contracts
            .balance_of(address!("0x000000000000000000000000000000000000dEaD"))
            .await
            .unwrap();
        assert_eq!(burned, WeiNewtype::from_eth(50));
    }

    #[tokio::test]
    async fn short_return_data_test() {
        let mut server = Server::new_async().await;
        mock_result(&mut server, Matcher::Any, "0x1234".to_string()).await;

        let contracts = contracts_with(&server);
        assert!(contracts.total_supply().await.is_err());
    }

    #[tokio::test]
    async fn cycle_out_of_u64_range_test() {
        let mut server = Server::new_async().await;
        mock_result(&mut server, Matcher::Any, uint_word(U256::MAX)).await;

        let contracts = contracts_with(&server);
        assert!(contracts.current_cycle().await.is_err());
        assert!(contracts.cycle_accrued_fees(1).await.is_err());
    }

    #[test]
    fn contract_abi_file_names_test() {
        assert_eq!(Contract::QContract.abi_file_name(), "QContract.json");
        assert_eq!(Contract::QErc20.abi_file_name(), "QERC20.json");
    }
}
