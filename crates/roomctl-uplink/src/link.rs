use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Network association as reported by the kernel
/// (`/sys/class/net/<iface>/operstate`).
#[derive(Debug, Clone)]
pub struct NetLink {
    operstate: Option<PathBuf>,
}

impl NetLink {
    /// No interface to watch: the link is assumed up.
    pub fn always_up() -> Self {
        Self { operstate: None }
    }

    pub fn iface(name: &str) -> Self {
        Self::from_operstate(format!("/sys/class/net/{}/operstate", name))
    }

    pub fn from_operstate(path: impl Into<PathBuf>) -> Self {
        Self { operstate: Some(path.into()) }
    }

    pub fn is_up(&self) -> bool {
        match &self.operstate {
            None => true,
            Some(p) => std::fs::read_to_string(p).map(|s| s.trim() == "up").unwrap_or(false),
        }
    }

    /// Polls every 500 ms until the link is up or `max` has passed.
    pub async fn wait_up(&self, max: Duration) -> bool {
        let start = Instant::now();
        if self.is_up() {
            return true;
        }
        info!("waiting for network link (up to {}s)", max.as_secs());
        while start.elapsed() < max {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if self.is_up() {
                info!("network link up after {}ms", start.elapsed().as_millis());
                return true;
            }
        }
        warn!("network link still down; no-load reports will be skipped until it comes up");
        false
    }
}
