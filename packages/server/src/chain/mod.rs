pub mod abi;
pub mod boost_contract;
pub mod rpc;
pub mod units;
pub mod wallet;

pub use boost_contract::{Boost, BoostContract, DEFAULT_CONTRACT_ADDRESS};
pub use rpc::{Receipt, RpcClient, RpcError};
pub use wallet::{ConnectError, Wallet, BASE_CHAIN_ID};
