//! 后台定时任务，启动时调用一次 `spawn_all`。

use std::time::Duration;

use crate::config::ReconciliationConfig;
use crate::services::ReconciliationService;

/// 启动全部定时任务（tokio::spawn 脱离执行，不阻塞）
pub fn spawn_all(reconciliation: &ReconciliationConfig, reconciliation_service: ReconciliationService) {
    if reconciliation.interval_secs == 0 {
        log::info!("Scheduled reconciliation disabled");
        return;
    }

    // 定时对账
    let interval = Duration::from_secs(reconciliation.interval_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match reconciliation_service.reconcile_failed_requests().await {
                Ok(repaired) if !repaired.is_empty() => {
                    log::info!("Scheduled reconciliation repaired {} requests", repaired.len())
                }
                Ok(_) => log::debug!("Scheduled reconciliation found nothing to repair"),
                Err(e) => log::error!("Scheduled reconciliation failed: {e:?}"),
            }
        }
    });
}
