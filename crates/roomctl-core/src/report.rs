use anyhow::Result;
use roomctl_proto::event::NoLoadEvent;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::gate::ReportGate;

/// Network capability used by the reporter.
pub trait HttpTransport {
    /// Whether the network link is currently associated.
    fn is_connected(&mut self) -> bool;

    /// One synchronous POST; resolves to the response status code.
    fn post(&mut self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> impl Future<Output = Result<u16>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The cycle did not qualify (empty room, load present or no sample).
    NotNeeded,
    /// No reporter configured.
    Disabled,
    /// Held back by the report policy.
    Suppressed,
    /// Link down; nothing was sent.
    LinkDown,
    Delivered { status: u16 },
    Rejected { status: u16 },
    Failed(String),
}

pub struct NoLoadReporter<T> {
    url: String,
    transport: T,
    gate: ReportGate,
}

impl<T: HttpTransport> NoLoadReporter<T> {
    pub fn new(url: String, transport: T, gate: ReportGate) -> Self {
        Self { url, transport, gate }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn on_cycle(&mut self, qualifying: bool, uptime: Duration, amps: f32) -> ReportOutcome {
        if !self.gate.admit(qualifying, uptime) {
            if qualifying {
                debug!("no-load report held back ({:?})", self.gate.policy());
                return ReportOutcome::Suppressed;
            }
            return ReportOutcome::NotNeeded;
        }

        if !self.transport.is_connected() {
            warn!("network down: no-load report skipped");
            return ReportOutcome::LinkDown;
        }

        let ev = NoLoadEvent::new(uptime.as_millis() as u64, amps);
        let body = match ev.to_json() {
            Ok(b) => b,
            Err(e) => {
                error!("no-load report: encode failed: {}", e);
                return ReportOutcome::Failed(e.to_string());
            }
        };

        match self.transport.post(&self.url, &[("Content-Type", "application/json")], &body).await {
            Ok(200) => {
                info!("no-load event logged");
                ReportOutcome::Delivered { status: 200 }
            }
            Ok(status) => {
                warn!("logging failed, code: {}", status);
                ReportOutcome::Rejected { status }
            }
            Err(e) => {
                warn!("logging failed: {:#}", e);
                ReportOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ReportPolicy;
    use crate::sim::SimTransport;

    const URL: &str = "http://logger.local/api/no-load";

    fn reporter(t: &SimTransport) -> NoLoadReporter<SimTransport> {
        NoLoadReporter::new(URL.into(), t.clone(), ReportGate::new(ReportPolicy::EveryCycle, Duration::ZERO))
    }

    #[tokio::test]
    async fn posts_json_with_content_type() {
        let t = SimTransport::new();
        let mut r = reporter(&t);
        let out = r.on_cycle(true, Duration::from_millis(4200), 0.456).await;
        assert_eq!(out, ReportOutcome::Delivered { status: 200 });

        let posts = t.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, URL);
        assert_eq!(posts[0].headers, vec![("Content-Type".to_string(), "application/json".to_string())]);
        assert_eq!(
            String::from_utf8(posts[0].body.clone()).unwrap(),
            r#"{"timestamp":"4200","current":0.46,"occupied":true}"#
        );
    }

    #[tokio::test]
    async fn link_down_skips_post() {
        let t = SimTransport::new();
        t.set_link(false);
        let mut r = reporter(&t);
        assert_eq!(r.on_cycle(true, Duration::ZERO, 0.0).await, ReportOutcome::LinkDown);
        assert!(t.posts().is_empty());
    }

    #[tokio::test]
    async fn non_ok_status_is_only_reported_back() {
        let t = SimTransport::new();
        t.set_status(503);
        let mut r = reporter(&t);
        assert_eq!(r.on_cycle(true, Duration::ZERO, 0.1).await, ReportOutcome::Rejected { status: 503 });
        // next cycle tries again like any other
        t.set_status(200);
        assert_eq!(r.on_cycle(true, Duration::ZERO, 0.1).await, ReportOutcome::Delivered { status: 200 });
        assert_eq!(t.posts().len(), 2);
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_outcome() {
        let t = SimTransport::new();
        t.set_error(true);
        let mut r = reporter(&t);
        assert!(matches!(r.on_cycle(true, Duration::ZERO, 0.1).await, ReportOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn non_qualifying_cycle_sends_nothing() {
        let t = SimTransport::new();
        let mut r = reporter(&t);
        assert_eq!(r.on_cycle(false, Duration::ZERO, 3.0).await, ReportOutcome::NotNeeded);
        assert!(t.posts().is_empty());
    }

    #[tokio::test]
    async fn suppressed_by_transition_policy() {
        let t = SimTransport::new();
        let mut r = NoLoadReporter::new(URL.into(), t.clone(), ReportGate::new(ReportPolicy::OnTransition, Duration::ZERO));
        assert!(matches!(r.on_cycle(true, Duration::ZERO, 0.0).await, ReportOutcome::Delivered { .. }));
        assert_eq!(r.on_cycle(true, Duration::from_millis(600), 0.0).await, ReportOutcome::Suppressed);
        assert_eq!(t.posts().len(), 1);
    }
}
