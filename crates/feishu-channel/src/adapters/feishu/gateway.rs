//! Gateway lifecycle for Feishu accounts.
//!
//! Starting an account hands the account's settings and the host's
//! cancellation token to the injected [`FeishuMonitor`]. Without a monitor
//! the gateway logs the start and returns an inert handle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapters::feishu::accounts::AccountResolver;
use crate::chain::{ProviderChain, ProviderSource};
use crate::config::{FeishuAccountConfig, HostConfig};
use crate::error::ChannelAdapterError;
use crate::logging::{FallbackEntry, FallbackLogger};
use crate::traits::{ChannelAccounts, ChannelGateway, FeishuMonitor, GatewayHandle};

/// What the host passes when it starts an account.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub account_id: String,
    pub cfg: Arc<HostConfig>,
    /// The only cancellation channel for this account's listener.
    pub abort_signal: CancellationToken,
}

impl GatewayContext {
    pub fn new(
        account_id: impl Into<String>,
        cfg: Arc<HostConfig>,
        abort_signal: CancellationToken,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            cfg,
            abort_signal,
        }
    }
}

/// What a monitor receives when asked to listen for one account.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub account_id: String,
    /// Resolved settings, or `None` when nothing is configured for the
    /// account. Monitors decide what an unconfigured account means.
    pub account: Option<FeishuAccountConfig>,
    pub cfg: Arc<HostConfig>,
    pub abort_signal: CancellationToken,
}

/// Handle returned when no monitor is wired in. Stopping it does nothing.
pub struct InertGatewayHandle {
    account_id: String,
    stopped: AtomicBool,
}

impl InertGatewayHandle {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayHandle for InertGatewayHandle {
    async fn stop(&self) -> Result<(), ChannelAdapterError> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!(account = %self.account_id, "Inert Feishu listener stopped");
        }
        Ok(())
    }
}

/// Handle for a receive loop running on its own task.
///
/// The loop gets a child of the host's token, so `stop` ends the loop even
/// when the host token has not fired, and a fired host token ends it too.
/// The task is joined at most once; later `stop` calls return immediately.
/// Dropping the handle cancels the loop without joining it.
pub struct TaskGatewayHandle {
    account_id: String,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TaskGatewayHandle {
    pub fn spawn<F, Fut>(
        account_id: impl Into<String>,
        abort_signal: &CancellationToken,
        run: F,
    ) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let account_id = account_id.into();
        let token = abort_signal.child_token();
        let task = tokio::spawn(run(token.clone()));
        tracing::debug!(account = %account_id, "Feishu listener task spawned");
        Self {
            account_id,
            token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Whether the loop has been told to stop, by `stop` or by the host.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[async_trait]
impl GatewayHandle for TaskGatewayHandle {
    async fn stop(&self) -> Result<(), ChannelAdapterError> {
        self.token.cancel();
        let task = self.task.lock().await.take();
        let Some(task) = task else {
            return Ok(());
        };
        match task.await {
            Ok(()) => {
                tracing::info!(account = %self.account_id, "Feishu listener stopped");
                Ok(())
            }
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(ChannelAdapterError::Internal(format!(
                "listener task for account '{}' failed: {}",
                self.account_id, e
            ))),
        }
    }
}

impl Drop for TaskGatewayHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Gateway half of the Feishu plugin.
pub struct FeishuGateway {
    monitor: Option<Arc<dyn FeishuMonitor>>,
    accounts: AccountResolver,
    fallback_log: Arc<FallbackLogger>,
}

impl FeishuGateway {
    pub fn new(
        monitor: Option<Arc<dyn FeishuMonitor>>,
        accounts: AccountResolver,
        fallback_log: Arc<FallbackLogger>,
    ) -> Self {
        Self {
            monitor,
            accounts,
            fallback_log,
        }
    }
}

#[async_trait]
impl ChannelGateway for FeishuGateway {
    async fn start_account(
        &self,
        ctx: GatewayContext,
    ) -> Result<Box<dyn GatewayHandle>, ChannelAdapterError> {
        let selected = ProviderChain::new()
            .then(ProviderSource::Injected, self.monitor.clone())
            .select();

        let Some((source, monitor)) = selected else {
            tracing::info!("Starting Feishu monitor for account {}", ctx.account_id);
            self.fallback_log
                .log(&FallbackEntry::gateway_start(&ctx.account_id))
                .await;
            return Ok(Box::new(InertGatewayHandle::new(ctx.account_id)));
        };

        let account = self
            .accounts
            .resolve_account(&ctx.cfg, Some(&ctx.account_id))?;

        tracing::info!(
            account = %ctx.account_id,
            source = %source,
            configured = account.is_some(),
            webhook_path = account.as_ref().map(|a| a.webhook_path()),
            "Starting Feishu monitor"
        );

        monitor
            .monitor(MonitorContext {
                account_id: ctx.account_id,
                account,
                cfg: ctx.cfg,
                abort_signal: ctx.abort_signal,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn single_account_cfg() -> Arc<HostConfig> {
        Arc::new(
            HostConfig::from_value(json!({
                "channels": {"feishu": {"accounts": {
                    "ops": {"appId": "cli_ops", "appSecret": "s"}
                }}}
            }))
            .unwrap(),
        )
    }

    struct CountingHandle {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GatewayHandle for CountingHandle {
        async fn stop(&self) -> Result<(), ChannelAdapterError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records what it was handed and returns a counting handle.
    struct RecordingMonitor {
        seen: Mutex<Vec<MonitorContext>>,
        stops: Arc<AtomicUsize>,
    }

    impl RecordingMonitor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                stops: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl FeishuMonitor for RecordingMonitor {
        async fn monitor(
            &self,
            ctx: MonitorContext,
        ) -> Result<Box<dyn GatewayHandle>, ChannelAdapterError> {
            self.seen.lock().await.push(ctx);
            Ok(Box::new(CountingHandle {
                stops: self.stops.clone(),
            }))
        }
    }

    struct RefusingMonitor;

    #[async_trait]
    impl FeishuMonitor for RefusingMonitor {
        async fn monitor(
            &self,
            _ctx: MonitorContext,
        ) -> Result<Box<dyn GatewayHandle>, ChannelAdapterError> {
            Err(ChannelAdapterError::Connection("ws handshake refused".to_string()))
        }
    }

    #[tokio::test]
    async fn fallback_handle_stops_twice() {
        let log = Arc::new(FallbackLogger::default());
        let gateway = FeishuGateway::new(None, AccountResolver::new(), log.clone());

        let handle = gateway
            .start_account(GatewayContext::new(
                "default",
                Arc::new(HostConfig::default()),
                CancellationToken::new(),
            ))
            .await
            .unwrap();
        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
        assert_eq!(log.entry_count().await, 1);
    }

    #[tokio::test]
    async fn monitor_receives_account_and_token() {
        let monitor = RecordingMonitor::new();
        let log = Arc::new(FallbackLogger::default());
        let gateway =
            FeishuGateway::new(Some(monitor.clone()), AccountResolver::new(), log.clone());
        let token = CancellationToken::new();

        let _handle = gateway
            .start_account(GatewayContext::new("ops", single_account_cfg(), token.clone()))
            .await
            .unwrap();

        let seen = monitor.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].account_id, "ops");
        assert_eq!(seen[0].account.as_ref().unwrap().app_id, "cli_ops");
        assert!(!seen[0].abort_signal.is_cancelled());
        token.cancel();
        assert!(seen[0].abort_signal.is_cancelled());
        assert_eq!(log.entry_count().await, 0);
    }

    #[tokio::test]
    async fn gateway_never_stops_monitor_handle() {
        let monitor = RecordingMonitor::new();
        let gateway = FeishuGateway::new(
            Some(monitor.clone()),
            AccountResolver::new(),
            Arc::new(FallbackLogger::default()),
        );
        let token = CancellationToken::new();

        let handle = gateway
            .start_account(GatewayContext::new("ops", single_account_cfg(), token.clone()))
            .await
            .unwrap();
        token.cancel();
        tokio::task::yield_now().await;
        assert_eq!(monitor.stops.load(Ordering::SeqCst), 0);

        handle.stop().await.unwrap();
        assert_eq!(monitor.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn monitor_error_propagates() {
        let log = Arc::new(FallbackLogger::default());
        let gateway = FeishuGateway::new(
            Some(Arc::new(RefusingMonitor)),
            AccountResolver::new(),
            log.clone(),
        );

        let result = gateway
            .start_account(GatewayContext::new(
                "ops",
                single_account_cfg(),
                CancellationToken::new(),
            ))
            .await;
        match result {
            Err(ChannelAdapterError::Connection(msg)) => assert_eq!(msg, "ws handshake refused"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected monitor failure"),
        }
        assert_eq!(log.entry_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_account_handed_to_monitor_unresolved() {
        let monitor = RecordingMonitor::new();
        let gateway = FeishuGateway::new(
            Some(monitor.clone()),
            AccountResolver::new(),
            Arc::new(FallbackLogger::default()),
        );

        let _handle = gateway
            .start_account(GatewayContext::new(
                "sales",
                single_account_cfg(),
                CancellationToken::new(),
            ))
            .await
            .unwrap();

        let seen = monitor.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].account_id, "sales");
        assert!(seen[0].account.is_none());
    }

    #[tokio::test]
    async fn monitor_started_without_any_config() {
        let monitor = RecordingMonitor::new();
        let log = Arc::new(FallbackLogger::default());
        let gateway =
            FeishuGateway::new(Some(monitor.clone()), AccountResolver::new(), log.clone());

        let handle = gateway
            .start_account(GatewayContext::new(
                "default",
                Arc::new(HostConfig::default()),
                CancellationToken::new(),
            ))
            .await
            .unwrap();
        handle.stop().await.unwrap();

        let seen = monitor.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert!(seen[0].account.is_none());
        assert_eq!(monitor.stops.load(Ordering::SeqCst), 1);
        assert_eq!(log.entry_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_account_blocks_monitor() {
        let monitor = RecordingMonitor::new();
        let gateway = FeishuGateway::new(
            Some(monitor.clone()),
            AccountResolver::new(),
            Arc::new(FallbackLogger::default()),
        );
        let cfg = Arc::new(
            HostConfig::from_value(json!({"channels": {"feishu": {"webhookPath": "/x"}}}))
                .unwrap(),
        );

        let result = gateway
            .start_account(GatewayContext::new("default", cfg, CancellationToken::new()))
            .await;
        assert!(matches!(result, Err(ChannelAdapterError::Validation { .. })));
        assert!(monitor.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn task_handle_stop_without_host_signal() {
        let host = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let handle = TaskGatewayHandle::spawn("ops", &host, |token| async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        handle.stop().await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert!(handle.is_cancelled());
        assert!(!host.is_cancelled());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn task_handle_stop_after_host_signal() {
        let host = CancellationToken::new();
        let handle = TaskGatewayHandle::spawn("ops", &host, |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {}
                }
            }
        });

        host.cancel();
        assert!(handle.is_cancelled());
        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn inert_handle_tracks_state() {
        let handle = InertGatewayHandle::new("default");
        assert!(!handle.is_stopped());
        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
        assert!(handle.is_stopped());
    }
}
