use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    /// Accepts `http://host[:port][/path]`; IPv6 literals go in brackets.
    pub fn parse(url: &str) -> Result<Self> {
        anyhow::ensure!(!url.starts_with("https://"), "https endpoints are not supported (no TLS): {}", url);
        let rest = url.strip_prefix("http://").context("endpoint must start with http://")?;
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.strip_prefix('[') {
            Some(v6) => {
                let (h, tail) = v6.split_once(']').with_context(|| format!("unclosed '[' in {}", url))?;
                match tail {
                    "" => (h, None),
                    t => (h, Some(t.strip_prefix(':').with_context(|| format!("junk after ']' in {}", url))?)),
                }
            }
            None => match authority.rsplit_once(':') {
                Some((h, p)) => (h, Some(p)),
                None => (authority, None),
            },
        };
        let port = match port {
            Some(p) => p.parse::<u16>().with_context(|| format!("bad port in {}", url))?,
            None => 80,
        };
        anyhow::ensure!(!host.is_empty(), "missing host in {}", url);
        Ok(Self { host: host.to_string(), port, path: path.to_string() })
    }

    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') { format!("[{}]", self.host) } else { self.host.clone() };
        if self.port == 80 { host } else { format!("{}:{}", host, self.port) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port_and_path() {
        let ep = Endpoint::parse("http://10.0.0.5:8080/api/no-load").unwrap();
        assert_eq!(ep, Endpoint { host: "10.0.0.5".into(), port: 8080, path: "/api/no-load".into() });
        assert_eq!(ep.host_header(), "10.0.0.5:8080");
    }

    #[test]
    fn defaults_port_and_path() {
        let ep = Endpoint::parse("http://your-server.com").unwrap();
        assert_eq!(ep.port, 80);
        assert_eq!(ep.path, "/");
        assert_eq!(ep.host_header(), "your-server.com");
    }

    #[test]
    fn ipv6_literal_loses_brackets() {
        let ep = Endpoint::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(ep, Endpoint { host: "::1".into(), port: 8080, path: "/x".into() });
        assert_eq!(ep.host_header(), "[::1]:8080");

        let ep = Endpoint::parse("http://[fe80::2]/").unwrap();
        assert_eq!((ep.host.as_str(), ep.port), ("fe80::2", 80));
        assert_eq!(ep.host_header(), "[fe80::2]");

        assert!(Endpoint::parse("http://[::1/x").is_err());
        assert!(Endpoint::parse("http://[::1]8080/x").is_err());
    }

    #[test]
    fn rejects_tls_and_garbage() {
        assert!(Endpoint::parse("https://your-server.com/api").is_err());
        assert!(Endpoint::parse("tcp://x:1").is_err());
        assert!(Endpoint::parse("http://:80/x").is_err());
        assert!(Endpoint::parse("http://host:port/x").is_err());
    }
}
