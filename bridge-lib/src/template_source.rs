use crate::error::{FetchError, ProbeError};
use crate::health::DependencyProbe;
use kaspa_addresses::Address;
use kaspa_rpc_core::api::rpc::RpcApi;
use kaspa_rpc_core::GetBlockTemplateResponse;
use kaspa_wrpc_client::KaspaRpcClient;
use serde::Serialize;
use std::future::Future;

/// Provider of mining templates. One call, one network round trip, no retry;
/// the poller decides what to do with a failed cycle.
pub trait TemplateSource: Send + Sync {
    type Template: Serialize + Send + Sync + 'static;

    fn fetch_template(
        &self,
        pay_address: &Address,
        extra_data: &[u8],
    ) -> impl Future<Output = Result<Self::Template, FetchError>> + Send;
}

/// Template source backed by the Kaspa node's wRPC interface.
///
/// `KaspaRpcClient` is safe to share across tasks, so the poller and the
/// health path hold clones of the same client.
#[derive(Clone)]
pub struct NodeTemplateClient {
    rpc_client: KaspaRpcClient,
}

impl NodeTemplateClient {
    pub fn new(rpc_client: KaspaRpcClient) -> Self {
        Self { rpc_client }
    }

    pub fn rpc_client(&self) -> &KaspaRpcClient {
        &self.rpc_client
    }
}

impl TemplateSource for NodeTemplateClient {
    type Template = GetBlockTemplateResponse;

    async fn fetch_template(
        &self,
        pay_address: &Address,
        extra_data: &[u8],
    ) -> Result<GetBlockTemplateResponse, FetchError> {
        if !self.rpc_client.is_connected() {
            return Err(FetchError::Disconnected);
        }
        Ok(self
            .rpc_client
            .get_block_template(pay_address.clone(), extra_data.to_vec())
            .await?)
    }
}

impl DependencyProbe for NodeTemplateClient {
    fn name(&self) -> &'static str {
        "kaspa_rpc"
    }

    // Reachability check only. The poll path is the one that exercises
    // template generation; probing with a full template request would tie
    // health to mining-address state.
    async fn probe(&self) -> Result<(), ProbeError> {
        if !self.rpc_client.is_connected() {
            return Err(ProbeError::Failed("node is not connected".to_string()));
        }
        self.rpc_client
            .get_server_info()
            .await
            .map_err(|err| ProbeError::Failed(err.to_string()))?;
        Ok(())
    }
}
