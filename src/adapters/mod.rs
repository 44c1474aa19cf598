// Adapters layer: concrete implementations of the domain ports (storage, ledger gateways).

pub mod abi;
pub mod file_store;
pub mod memory;
pub mod mock_gateway;
pub mod rpc;
pub mod rpc_gateway;
pub mod storage;

pub use file_store::FileStore;
pub use memory::InMemoryStore;
pub use mock_gateway::MockLedgerGateway;
pub use rpc::LedgerConnection;
pub use rpc_gateway::JsonRpcLedgerGateway;
pub use storage::LocalStorage;
