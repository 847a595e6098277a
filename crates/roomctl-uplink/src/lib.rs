pub mod doctor;
mod endpoint;
pub mod link;

use anyhow::{Context, Result};
use roomctl_core::report::HttpTransport;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

pub use endpoint::Endpoint;
pub use link::NetLink;

#[derive(Debug, Clone, Default)]
pub struct LinkHealth {
    pub rtt_ms: Option<u32>,
    pub last_status: Option<u16>,
    pub consecutive_failures: u32,
}

/// Plain HTTP/1.1 client: one connection per POST, no retries.
pub struct HttpClient {
    link: NetLink,
    timeout: Option<Duration>,
    health: LinkHealth,
}

impl HttpClient {
    pub fn new(link: NetLink, timeout: Option<Duration>) -> Self {
        Self { link, timeout, health: LinkHealth::default() }
    }

    pub fn link_health(&self) -> &LinkHealth {
        &self.health
    }
}

impl HttpTransport for HttpClient {
    fn is_connected(&mut self) -> bool {
        self.link.is_up()
    }

    async fn post(&mut self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<u16> {
        let ep = Endpoint::parse(url)?;
        let start = Instant::now();

        let result = match self.timeout {
            Some(t) => match tokio::time::timeout(t, exchange(&ep, headers, body)).await {
                Ok(r) => r,
                Err(_) => Err(anyhow::anyhow!("no response within {}ms", t.as_millis())),
            },
            None => exchange(&ep, headers, body).await,
        };

        match &result {
            Ok(status) => {
                let rtt = start.elapsed().as_millis() as u32;
                self.health.rtt_ms = Some(rtt);
                self.health.last_status = Some(*status);
                self.health.consecutive_failures = 0;
                debug!("uplink: POST {} -> {} ({} bytes, RTT: {}ms)", ep.path, status, body.len(), rtt);
            }
            Err(e) => {
                self.health.consecutive_failures += 1;
                warn!("uplink: POST {}:{} failed (failures: {}): {:#}",
                      ep.host, ep.port, self.health.consecutive_failures, e);
            }
        }
        result
    }
}

async fn exchange(ep: &Endpoint, headers: &[(&str, &str)], body: &[u8]) -> Result<u16> {
    let mut tcp = TcpStream::connect((ep.host.as_str(), ep.port))
        .await
        .with_context(|| format!("connect {}:{}", ep.host, ep.port))?;

    let mut req = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        ep.path,
        ep.host_header(),
        body.len()
    );
    for (k, v) in headers {
        req.push_str(k);
        req.push_str(": ");
        req.push_str(v);
        req.push_str("\r\n");
    }
    req.push_str("\r\n");

    tcp.write_all(req.as_bytes()).await?;
    tcp.write_all(body).await?;
    tcp.flush().await?;

    let mut reader = BufReader::new(tcp);
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.context("read status line")?;
    anyhow::ensure!(n > 0, "connection closed before response");
    parse_status_line(&line)
}

fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    anyhow::ensure!(version.starts_with("HTTP/"), "not an HTTP response: {:?}", line.trim());
    let code = parts.next().context("missing status code")?;
    code.parse().with_context(|| format!("bad status code {:?}", code))
}
