//! TLS-Transport (tokio-rustls)
//!
//! Der Server authentifiziert sich per Zertifikat, Clients vertrauen einem
//! mitgelieferten CA-Buendel. Client-Zertifikate gibt es nicht.
//!
//! Beide Seiten bauen ihre Konfiguration explizit mit dem ring-Provider,
//! es wird kein prozessweiter Default-Provider vorausgesetzt.

use std::sync::Arc;

use rcgen::{CertificateParams, DistinguishedName, KeyPair as RcgenKeyPair};
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::error::{CryptoError, CryptoResult};

/// PEM-kodiertes Zertifikat plus Schluessel
#[derive(Clone)]
pub struct TlsMaterial {
    pub zertifikat_pem: String,
    pub schluessel_pem: String,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("zertifikat_bytes", &self.zertifikat_pem.len())
            .finish_non_exhaustive()
    }
}

/// Generiert ein selbstsigniertes Zertifikat fuer Development/Testing
pub fn selbstsigniertes_zertifikat(hostnamen: &[&str]) -> CryptoResult<TlsMaterial> {
    let namen: Vec<String> = hostnamen.iter().map(|h| h.to_string()).collect();
    let mut params = CertificateParams::new(namen)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    let mut dn = DistinguishedName::new();
    dn.push(
        rcgen::DnType::CommonName,
        hostnamen.first().copied().unwrap_or("hushline"),
    );
    params.distinguished_name = dn;

    let key_pair =
        RcgenKeyPair::generate().map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    Ok(TlsMaterial {
        zertifikat_pem: cert.pem(),
        schluessel_pem: key_pair.serialize_pem(),
    })
}

/// Erstellt den serverseitigen TLS-Acceptor
pub fn server_acceptor(material: &TlsMaterial) -> CryptoResult<TlsAcceptor> {
    let cert_chain = parse_certificates(&material.zertifikat_pem)?;
    let schluessel = parse_private_key(&material.schluessel_pem)?;

    let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| CryptoError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, schluessel)
        .map_err(|e| CryptoError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Erstellt einen TLS-Connector, der nur den Zertifikaten aus `ca_pem` vertraut
pub fn client_connector(ca_pem: &str) -> CryptoResult<TlsConnector> {
    let mut roots = RootCertStore::empty();
    for cert in parse_certificates(ca_pem)? {
        roots
            .add(cert)
            .map_err(|e| CryptoError::Tls(format!("CA-Zertifikat ungueltig: {e}")))?;
    }

    let config = ClientConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| CryptoError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Wandelt einen Hostnamen in einen `ServerName` fuer den Handshake
pub fn server_name(hostname: &str) -> CryptoResult<ServerName<'static>> {
    ServerName::try_from(hostname.to_string())
        .map_err(|e| CryptoError::Tls(format!("Ungueltiger Servername '{hostname}': {e}")))
}

fn parse_certificates(pem: &str) -> CryptoResult<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    let zertifikate = certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CryptoError::Tls(format!("Zertifikat-Parsing fehlgeschlagen: {}", e)))?;
    if zertifikate.is_empty() {
        return Err(CryptoError::Tls("Kein Zertifikat gefunden".to_string()));
    }
    Ok(zertifikate)
}

fn parse_private_key(pem: &str) -> CryptoResult<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    private_key(&mut cursor)
        .map_err(|e| CryptoError::Tls(format!("Schluessel-Parsing fehlgeschlagen: {}", e)))?
        .ok_or_else(|| CryptoError::Tls("Kein privater Schluessel gefunden".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn acceptor_aus_selbstsigniertem_zertifikat() {
        let material = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        assert!(material.zertifikat_pem.contains("BEGIN CERTIFICATE"));
        assert!(server_acceptor(&material).is_ok());
        assert!(client_connector(&material.zertifikat_pem).is_ok());
    }

    #[test]
    fn ungueltiges_material_schlaegt_fehl() {
        let material = TlsMaterial {
            zertifikat_pem: "ungueltig".to_string(),
            schluessel_pem: "ungueltig".to_string(),
        };
        assert!(server_acceptor(&material).is_err());
        assert!(client_connector("ungueltig").is_err());
    }

    #[test]
    fn debug_zeigt_keinen_schluessel() {
        let material = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        let text = format!("{:?}", material);
        assert!(!text.contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn handshake_ueber_duplex() {
        let material = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        let acceptor = server_acceptor(&material).unwrap();
        let connector = client_connector(&material.zertifikat_pem).unwrap();

        let (client_io, server_io) = tokio::io::duplex(4096);
        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept(server_io).await.unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut stream = connector
            .connect(server_name("localhost").unwrap(), client_io)
            .await
            .unwrap();
        stream.write_all(b"hallo").await.unwrap();
        stream.flush().await.unwrap();

        assert_eq!(&server.await.unwrap(), b"hallo");
    }

    #[tokio::test]
    async fn fremde_ca_wird_abgelehnt() {
        let server_material = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        let fremd = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        let acceptor = server_acceptor(&server_material).unwrap();
        let connector = client_connector(&fremd.zertifikat_pem).unwrap();

        let (client_io, server_io) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let _ = acceptor.accept(server_io).await;
        });

        let result = connector
            .connect(server_name("localhost").unwrap(), client_io)
            .await;
        assert!(result.is_err());
    }
}
