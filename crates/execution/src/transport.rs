//! Engine transport: the authenticated engine channel and the plain query channel.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use alloy_primitives::{B256, U64};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus,
};
use async_trait::async_trait;
use evm_exec_types::ExecutionConfig;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::transport::HttpBackend;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;

use crate::auth::{AuthClientLayer, AuthClientService, CredentialCache};
use crate::jwt::{CredentialProvider, JwtCredentialProvider};
use crate::payload::{
    BlockRef, TxpoolContent, CHAIN_ID, FORKCHOICE_UPDATED_V1, GET_BLOCK_BY_NUMBER, GET_PAYLOAD_V1,
    NEW_PAYLOAD_V1, TXPOOL_CONTENT,
};
use crate::rpc::{EngineRpc, RpcResult};
use crate::{ExecutionError, Result};

/// HTTP client for the authenticated engine endpoint.
pub type EngineHttpClient = HttpClient<AuthClientService<HttpBackend>>;

/// Transport tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    /// Per-request timeout on both channels.
    pub request_timeout: Duration,

    /// Re-issue the engine token once it is this close to expiry.
    pub token_renewal_margin: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(10), token_renewal_margin: Duration::from_secs(60) }
    }
}

/// One configured connection to an execution engine.
///
/// Cheap to clone; clones share the underlying HTTP clients and credential.
/// Closing any clone releases both channels for all of them.
#[derive(Clone)]
pub struct ChainHandle {
    inner: Arc<Inner>,
}

struct Inner {
    /// `None` once closed.
    channels: RwLock<Option<Channels>>,
    credentials: Arc<CredentialCache>,
    engine_url: String,
    eth_url: String,
}

struct Channels {
    engine: EngineHttpClient,
    eth: HttpClient,
}

impl ChainHandle {
    /// Connect to an engine using a TOML-level execution config.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be loaded or either endpoint is
    /// unreachable.
    pub async fn from_config(config: &ExecutionConfig) -> Result<Self> {
        let provider = JwtCredentialProvider::from_file(&config.jwt_secret_path)?
            .with_validity(config.token_validity());
        let options = TransportOptions {
            request_timeout: config.request_timeout(),
            token_renewal_margin: config.token_renewal_margin(),
        };
        Self::connect(&config.engine_url, &config.eth_url, Arc::new(provider), options).await
    }

    /// Build both channels and probe each with `eth_chainId`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Credential`] if no token can be issued and
    /// [`ExecutionError::ConnectionFailed`] if either endpoint is unreachable.
    pub async fn connect(
        engine_url: &str,
        eth_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        options: TransportOptions,
    ) -> Result<Self> {
        let cache = Arc::new(CredentialCache::new(credentials, options.token_renewal_margin)?);
        let middleware = tower::ServiceBuilder::new().layer(AuthClientLayer::new(cache.clone()));

        let engine = HttpClientBuilder::default()
            .request_timeout(options.request_timeout)
            .set_http_middleware(middleware)
            .build(engine_url)
            .map_err(|e| connection_failed(engine_url, e))?;

        let eth = HttpClientBuilder::default()
            .request_timeout(options.request_timeout)
            .build(eth_url)
            .map_err(|e| connection_failed(eth_url, e))?;

        let engine_chain_id = probe(&engine, engine_url).await?;
        let eth_chain_id = probe(&eth, eth_url).await?;

        if engine_chain_id != eth_chain_id {
            tracing::warn!(engine_chain_id, eth_chain_id, "Engine and query endpoints report different chain ids");
        }

        tracing::info!(engine_url, eth_url, chain_id = engine_chain_id, "Connected to execution engine");

        Ok(Self {
            inner: Arc::new(Inner {
                channels: RwLock::new(Some(Channels { engine, eth })),
                credentials: cache,
                engine_url: engine_url.to_string(),
                eth_url: eth_url.to_string(),
            }),
        })
    }

    /// Engine endpoint URL.
    #[must_use]
    pub fn engine_url(&self) -> &str {
        &self.inner.engine_url
    }

    /// Query endpoint URL.
    #[must_use]
    pub fn eth_url(&self) -> &str {
        &self.inner.eth_url
    }

    /// Whether [`EngineRpc::close`] has been called on any clone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.channels.read().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    fn engine(&self) -> RpcResult<EngineHttpClient> {
        self.channel(|c| c.engine.clone())
    }

    fn eth(&self) -> RpcResult<HttpClient> {
        self.channel(|c| c.eth.clone())
    }

    fn channel<T>(&self, pick: impl FnOnce(&Channels) -> T) -> RpcResult<T> {
        let channels = self.inner.channels.read().unwrap_or_else(|e| e.into_inner());
        channels
            .as_ref()
            .map(pick)
            .ok_or_else(|| ClientError::Custom("chain handle is closed".to_string()))
    }
}

async fn probe<C: ClientT>(client: &C, url: &str) -> Result<u64> {
    let chain_id: U64 =
        client.request(CHAIN_ID, rpc_params![]).await.map_err(|e| connection_failed(url, e))?;
    Ok(chain_id.to())
}

fn connection_failed(endpoint: &str, err: impl std::fmt::Display) -> ExecutionError {
    ExecutionError::ConnectionFailed { endpoint: endpoint.to_string(), reason: err.to_string() }
}

#[async_trait]
impl EngineRpc for ChainHandle {
    async fn fork_choice_updated_v1(
        &self,
        fork_choice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> RpcResult<ForkchoiceUpdated> {
        self.engine()?
            .request(FORKCHOICE_UPDATED_V1, rpc_params![fork_choice_state, payload_attributes])
            .await
    }

    async fn get_payload_v1(&self, payload_id: PayloadId) -> RpcResult<ExecutionPayloadV1> {
        self.engine()?.request(GET_PAYLOAD_V1, rpc_params![payload_id]).await
    }

    async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> RpcResult<PayloadStatus> {
        self.engine()?.request(NEW_PAYLOAD_V1, rpc_params![payload]).await
    }

    async fn block_hash_by_number(&self, number: u64) -> RpcResult<Option<B256>> {
        let block: Option<BlockRef> = self
            .eth()?
            .request(GET_BLOCK_BY_NUMBER, rpc_params![format!("{number:#x}"), false])
            .await?;
        Ok(block.map(|b| b.hash))
    }

    async fn txpool_content(&self) -> RpcResult<TxpoolContent> {
        self.eth()?.request(TXPOOL_CONTENT, rpc_params![]).await
    }

    fn ready(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ExecutionError::Closed);
        }
        self.inner.credentials.authorization()?;
        Ok(())
    }

    fn close(&self) {
        let released = self.inner.channels.write().unwrap_or_else(|e| e.into_inner()).take();
        if released.is_some() {
            tracing::info!(engine_url = %self.inner.engine_url, "Chain handle closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use jsonrpsee::server::{Server, ServerHandle};
    use jsonrpsee::RpcModule;

    use super::*;
    use crate::jwt::{unix_now, Credential, CredentialError};

    const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn provider() -> Arc<dyn CredentialProvider> {
        Arc::new(JwtCredentialProvider::from_hex(SECRET).unwrap())
    }

    /// Node answering only `eth_chainId`, enough to connect.
    async fn chain_id_node() -> (String, ServerHandle) {
        let server = Server::builder().build("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", server.local_addr().unwrap());
        let mut module = RpcModule::new(());
        module.register_method(CHAIN_ID, |_, _, _| Ok::<_, jsonrpsee::types::ErrorObjectOwned>(U64::from(1u64))).unwrap();
        (url, server.start(module))
    }

    /// Issues one stale token, then fails every renewal.
    struct FailingRenewal {
        inner: JwtCredentialProvider,
        issued: AtomicU64,
    }

    impl CredentialProvider for FailingRenewal {
        fn issue(&self) -> std::result::Result<Credential, CredentialError> {
            if self.issued.fetch_add(1, Ordering::SeqCst) == 0 {
                return self.inner.issue_at(unix_now()? - 120);
            }
            Err(CredentialError::Signing("hsm offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_close_releases_channels_for_every_clone() {
        let (url, _server) = chain_id_node().await;
        let handle = ChainHandle::connect(&url, &url, provider(), Default::default()).await.unwrap();
        let other = handle.clone();
        assert!(other.ready().is_ok());

        handle.close();
        handle.close();
        assert!(other.is_closed());
        assert!(matches!(other.ready(), Err(ExecutionError::Closed)));
        assert!(other.txpool_content().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_renewal_is_reported_before_sending() {
        let (url, _server) = chain_id_node().await;
        let credentials = Arc::new(FailingRenewal {
            inner: JwtCredentialProvider::from_hex(SECRET).unwrap(),
            issued: AtomicU64::new(0),
        });
        let handle = ChainHandle::connect(&url, &url, credentials, Default::default()).await.unwrap();

        match handle.ready() {
            Err(ExecutionError::Credential(CredentialError::Signing(reason))) => {
                assert_eq!(reason, "hsm offline");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_engine_fails_connect() {
        let options = TransportOptions {
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        // Port 1 is never an engine.
        let result =
            ChainHandle::connect("http://127.0.0.1:1", "http://127.0.0.1:1", provider(), options)
                .await;
        match result {
            Err(ExecutionError::ConnectionFailed { endpoint, .. }) => {
                assert_eq!(endpoint, "http://127.0.0.1:1");
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_connect() {
        let result =
            ChainHandle::connect("not a url", "http://127.0.0.1:1", provider(), Default::default())
                .await;
        assert!(matches!(result, Err(ExecutionError::ConnectionFailed { .. })));
    }
}
