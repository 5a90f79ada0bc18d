//! TLS material provider capability (§9 design note: "TLS material
//! obtained from host config" → abstracted behind a `TlsProvider`).

use async_trait::async_trait;

use super::endpoint::Endpoint;
use crate::error::Result;

/// Certificate/key/CA material for upgrading a plaintext socket to TLS,
/// obtained transparently when the host reports TLS enabled (§4.1).
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub cert: Option<Vec<u8>>,
    pub key: Option<Vec<u8>>,
    pub ca: Option<Vec<u8>>,
    pub pass: Option<String>,
}

#[async_trait]
pub trait TlsProvider: Send + Sync {
    /// Whether the host reports TLS enabled for this endpoint.
    async fn tls_enabled(&self, endpoint: &Endpoint) -> Result<bool>;

    /// Fetch the material needed to upgrade the socket.
    async fn material(&self, endpoint: &Endpoint) -> Result<TlsMaterial>;
}

/// A provider that never enables TLS; used when the deployment has no TLS
/// configuration (and in tests).
#[derive(Debug, Default)]
pub struct NoTls;

#[async_trait]
impl TlsProvider for NoTls {
    async fn tls_enabled(&self, _endpoint: &Endpoint) -> Result<bool> {
        Ok(false)
    }

    async fn material(&self, _endpoint: &Endpoint) -> Result<TlsMaterial> {
        Ok(TlsMaterial::default())
    }
}
