//! Port publishing declarations.

use c2m_common::error::{ConvertError, Result};

use crate::model::{RawPort, Scalar};

/// One container port and, if published, its host binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: u16,
    /// `tcp` or `udp`.
    pub protocol: String,
    /// Host interface, if restricted.
    pub host_ip: Option<String>,
    /// Host port; `None` publishes on an ephemeral port.
    pub host_port: Option<String>,
}

impl PortBinding {
    /// Engine key of the container side, e.g. `80/tcp`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

/// Parses a `ports` entry into one binding per container port.
///
/// # Errors
///
/// Returns an error on malformed entries or mismatched ranges.
pub fn parse_port(raw: &RawPort) -> Result<Vec<PortBinding>> {
    match raw {
        RawPort::Short(Scalar::Str(spec)) => parse_short(spec),
        RawPort::Short(other) => parse_short(&other.to_string()),
        RawPort::Long(spec) => {
            let protocol = spec.protocol.clone().unwrap_or_else(|| "tcp".into());
            Ok(vec![PortBinding {
                container_port: spec.target,
                protocol,
                host_ip: spec.host_ip.clone(),
                host_port: spec.published.as_ref().map(ToString::to_string),
            }])
        }
    }
}

/// Parses an `expose` entry (`3000` or `3000/udp`) into engine keys.
///
/// # Errors
///
/// Returns an error on malformed entries.
pub fn parse_expose(raw: &Scalar) -> Result<Vec<String>> {
    let text = raw.to_string();
    let (ports, protocol) = split_protocol(&text);
    Ok(parse_range(ports, &text)?
        .into_iter()
        .map(|p| format!("{p}/{protocol}"))
        .collect())
}

fn parse_short(spec: &str) -> Result<Vec<PortBinding>> {
    let (body, protocol) = split_protocol(spec);
    let parts: Vec<&str> = body.rsplitn(3, ':').collect();
    let (host_ip, host, container) = match parts.as_slice() {
        [container] => (None, None, *container),
        [container, host] => (None, Some(*host), *container),
        [container, host, ip] => (Some(*ip), Some(*host), *container),
        _ => return Err(invalid(spec)),
    };

    let container_ports = parse_range(container, spec)?;
    let host_ports: Vec<Option<String>> = match host.filter(|h| !h.is_empty()) {
        None => vec![None; container_ports.len()],
        Some(h) => {
            let ports = parse_range(h, spec)?;
            if ports.len() == container_ports.len() {
                ports.into_iter().map(|p| Some(p.to_string())).collect()
            } else if ports.len() > 1 && container_ports.len() == 1 {
                vec![Some(h.to_string())]
            } else {
                return Err(invalid(spec));
            }
        }
    };
    let host_ip = host_ip
        .filter(|ip| !ip.is_empty())
        .map(|ip| ip.trim_matches(|c| c == '[' || c == ']').to_string());

    Ok(container_ports
        .into_iter()
        .zip(host_ports)
        .map(|(container_port, host_port)| PortBinding {
            container_port,
            protocol: protocol.to_string(),
            host_ip: host_ip.clone(),
            host_port,
        })
        .collect())
}

fn split_protocol(spec: &str) -> (&str, &str) {
    spec.split_once('/').unwrap_or((spec, "tcp"))
}

fn parse_range(text: &str, spec: &str) -> Result<Vec<u16>> {
    let parse = |s: &str| s.trim().parse::<u16>().map_err(|_| invalid(spec));
    match text.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(invalid(spec));
            }
            Ok((start..=end).collect())
        }
        None => Ok(vec![parse(text)?]),
    }
}

fn invalid(spec: &str) -> ConvertError {
    ConvertError::Config {
        message: format!("invalid port specification: \"{spec}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawPortSpec;

    fn short(s: &str) -> Vec<PortBinding> {
        parse_port(&RawPort::Short(Scalar::Str(s.into()))).expect("valid port")
    }

    #[test]
    fn container_only_port_publishes_ephemeral() {
        let ports = parse_port(&RawPort::Short(Scalar::Int(80))).expect("valid");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].key(), "80/tcp");
        assert!(ports[0].host_port.is_none());
    }

    #[test]
    fn host_and_container_port_with_protocol() {
        let ports = short("5353:53/udp");
        assert_eq!(ports[0].key(), "53/udp");
        assert_eq!(ports[0].host_port.as_deref(), Some("5353"));
    }

    #[test]
    fn host_ip_is_kept() {
        let ports = short("127.0.0.1:8080:80");
        assert_eq!(ports[0].host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(ports[0].host_port.as_deref(), Some("8080"));
    }

    #[test]
    fn empty_host_port_with_ip_is_ephemeral() {
        let ports = short("127.0.0.1::80");
        assert_eq!(ports[0].host_ip.as_deref(), Some("127.0.0.1"));
        assert!(ports[0].host_port.is_none());
    }

    #[test]
    fn ranges_expand_pairwise() {
        let ports = short("9000-9001:3000-3001");
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[1].key(), "3001/tcp");
        assert_eq!(ports[1].host_port.as_deref(), Some("9001"));
    }

    #[test]
    fn mismatched_ranges_error() {
        assert!(parse_port(&RawPort::Short(Scalar::Str("1-3:1-2".into()))).is_err());
    }

    #[test]
    fn long_syntax_maps_fields() {
        let ports = parse_port(&RawPort::Long(RawPortSpec {
            target: 443,
            published: Some(Scalar::Int(8443)),
            protocol: None,
            host_ip: None,
        }))
        .expect("valid");
        assert_eq!(ports[0].key(), "443/tcp");
        assert_eq!(ports[0].host_port.as_deref(), Some("8443"));
    }

    #[test]
    fn expose_accepts_protocol() {
        assert_eq!(
            parse_expose(&Scalar::Str("3000/udp".into())).expect("ok"),
            vec!["3000/udp"]
        );
    }
}
