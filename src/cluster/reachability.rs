use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

use super::HostPort;
use crate::{AppError, AppResult};

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `true` when `endpoint` accepted a connection within `timeout`.
    async fn is_reachable(&self, endpoint: &HostPort, timeout: Duration) -> bool;
}

/// Opens, and immediately drops, a TCP connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpReachabilityProbe;

#[async_trait]
impl ReachabilityProbe for TcpReachabilityProbe {
    async fn is_reachable(&self, endpoint: &HostPort, timeout: Duration) -> bool {
        let address = (endpoint.host.as_str(), endpoint.port);
        match time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                trace!("connect to {} failed: {}", endpoint, err);
                false
            }
            Err(_) => {
                trace!("connect to {} timed out after {:?}", endpoint, timeout);
                false
            }
        }
    }
}

/// Succeeds with the first endpoint that answers.
///
/// One reachable listener is enough, even if clients would end up on another
/// one. Fails with [`AppError::ClusterConfiguration`] listing every endpoint
/// when none answers.
pub async fn ensure_any_reachable(
    probe: &dyn ReachabilityProbe,
    endpoints: &[HostPort],
    timeout: Duration,
) -> AppResult<HostPort> {
    let mut unreachable = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        debug!("found advertised listener: {}", endpoint);
        if probe.is_reachable(endpoint, timeout).await {
            trace!("advertised listener {} is reachable", endpoint);
            return Ok(endpoint.clone());
        }
        trace!("advertised listener {} is not reachable", endpoint);
        unreachable.push(endpoint.to_string());
    }

    Err(AppError::ClusterConfiguration {
        message: format!(
            "Cluster config for 'advertised.listeners' is invalid.\n\n\
             * None of advertised listeners '{:?}' are reachable from outside world.\n\
             * Producers/consumers would be unable to use this kafka cluster.",
            unreachable
        ),
        unreachable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Port that was just free: connecting to it is refused right away.
    async fn closed_endpoint() -> HostPort {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        HostPort::new("127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_one_reachable_endpoint_is_enough() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = HostPort::new("127.0.0.1", listener.local_addr().unwrap().port());
        let closed = closed_endpoint().await;

        let found = ensure_any_reachable(
            &TcpReachabilityProbe,
            &[closed, open.clone()],
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(found, open);
    }

    #[tokio::test]
    async fn test_bracketed_ipv6_listener_is_reachable() {
        let listener = TcpListener::bind("[::1]:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint: HostPort = format!("[::1]:{}", port).parse().unwrap();

        let found = ensure_any_reachable(&TcpReachabilityProbe, &[endpoint], Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(found.host, "::1");
        assert_eq!(found.to_string(), format!("[::1]:{}", port));
    }

    #[tokio::test]
    async fn test_all_unreachable_lists_endpoints() {
        let first = closed_endpoint().await;
        let second = closed_endpoint().await;

        let result = ensure_any_reachable(
            &TcpReachabilityProbe,
            &[first.clone(), second.clone()],
            Duration::from_secs(2),
        )
        .await;

        match result {
            Err(AppError::ClusterConfiguration {
                message,
                unreachable,
            }) => {
                assert_eq!(unreachable, vec![first.to_string(), second.to_string()]);
                assert!(message.contains(&first.to_string()));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_endpoints_is_unreachable() {
        let result = ensure_any_reachable(&TcpReachabilityProbe, &[], Duration::from_millis(10)).await;
        assert!(matches!(
            result,
            Err(AppError::ClusterConfiguration { ref unreachable, .. }) if unreachable.is_empty()
        ));
    }
}
