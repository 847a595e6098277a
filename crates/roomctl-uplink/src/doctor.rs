use anyhow::Result;
use std::path::Path;

use crate::endpoint::Endpoint;

pub fn check_endpoint(url: &str) -> Result<()> {
    let ep = Endpoint::parse(url)?;
    anyhow::ensure!(ep.host != "your-server.com", "report.url still points at the placeholder host");
    Ok(())
}

pub fn check_iface(name: &str) -> Result<()> {
    let p = Path::new("/sys/class/net").join(name);
    anyhow::ensure!(p.exists(), "network.iface not found: {}", name);
    Ok(())
}
