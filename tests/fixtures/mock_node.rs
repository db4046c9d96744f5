#![allow(unused)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use alloy_sol_types::SolValue;
use anyhow::Result;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use goldoracle::{
    model::{address_hex, Address, U256},
    rpc::ContractCall,
};

#[derive(Default)]
pub struct MockNodeState {
    /// (to, calldata hex) -> return data hex
    pub views: HashMap<(String, String), String>,
    pub sent: Vec<Value>,
    pub reject_writes: bool,
    pub revert_writes: bool,
    pub methods: Vec<String>,
}

/// A JSON-RPC node answering `eth_call` from a table, accepting every transaction.
pub struct MockNode {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<MockNodeState>>,
    handle: JoinHandle<()>,
}

impl MockNode {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(Mutex::new(MockNodeState::default()));
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn set_view(&self, call: impl AsRef<ContractCall>, value: U256) {
        let call = call.as_ref();
        let ret = format!("0x{}", hex::encode(value.abi_encode()));
        self.state
            .lock()
            .unwrap()
            .views
            .insert((address_hex(&call.to), call.data_hex()), ret);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    }))
}

fn rpc_result(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn handle_rpc(
    State(state): State<Arc<Mutex<MockNodeState>>>,
    Json(req): Json<Value>,
) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    state.methods.push(method.clone());

    match method.as_str() {
        "eth_chainId" => rpc_result(&id, json!("0x7a69")),
        "eth_call" => {
            let to = req["params"][0]["to"].as_str().unwrap_or_default().to_string();
            let data = req["params"][0]["data"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            match state.views.get(&(to, data)) {
                Some(ret) => rpc_result(&id, json!(ret)),
                None => rpc_error(&id, 3, "execution reverted"),
            }
        }
        "eth_sendTransaction" => {
            if state.reject_writes {
                return rpc_error(&id, 4001, "User rejected the request.");
            }
            state.sent.push(req["params"][0].clone());
            let hash = format!("0x{:064x}", state.sent.len());
            rpc_result(&id, json!(hash))
        }
        "eth_getTransactionReceipt" => {
            let hash = req["params"][0].clone();
            let status = if state.revert_writes { "0x0" } else { "0x1" };
            rpc_result(
                &id,
                json!({ "transactionHash": hash, "blockNumber": "0x1", "status": status }),
            )
        }
        _ => rpc_error(&id, -32601, "method not found"),
    }
}

pub fn gof() -> Address {
    Address::repeat_byte(0x11)
}

pub fn collateral() -> Address {
    Address::repeat_byte(0x22)
}

pub fn owner() -> Address {
    Address::repeat_byte(0x33)
}
