//! Per-service container creation parameters.
//!
//! [`ContainerCreateOptions`] is what the resolver hands downstream: the
//! attributes a container engine needs to create the service's container,
//! with the host configuration already in engine shape. Fields that are not
//! set stay `None`/empty here; deciding what to drop is the consumer's job.

use serde_json::{Map, Value, json};

use crate::service::{Healthcheck, NetworkMode, Service};

/// Creation parameters of one service container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerCreateOptions {
    /// Image reference.
    pub image: Option<String>,
    /// Command override.
    pub command: Vec<String>,
    /// Container hostname.
    pub hostname: Option<String>,
    /// User to run as.
    pub user: Option<String>,
    /// Run detached (no attached stdout/stderr).
    pub detach: bool,
    /// Keep stdin open.
    pub stdin_open: bool,
    /// Allocate a TTY.
    pub tty: bool,
    /// Exposed container ports as engine keys (`80/tcp`).
    pub ports: Vec<String>,
    /// `KEY=value` environment entries.
    pub environment: Vec<String>,
    /// Container-side volume paths.
    pub volumes: Vec<String>,
    /// Disable networking entirely.
    pub network_disabled: bool,
    /// Entrypoint override.
    pub entrypoint: Vec<String>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// Container domain name.
    pub domainname: Option<String>,
    /// Engine-shaped host configuration.
    pub host_config: Map<String, Value>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Container labels.
    pub labels: Map<String, Value>,
    /// Signal used to stop the container.
    pub stop_signal: Option<String>,
    /// Engine-shaped network attachment.
    pub networking_config: Option<Value>,
    /// Engine-shaped healthcheck.
    pub healthcheck: Option<Value>,
    /// Seconds to wait before killing on stop.
    pub stop_timeout: Option<u64>,
    /// OCI runtime name.
    pub runtime: Option<String>,
}

impl Service {
    /// Builds the container creation parameters of this service.
    pub fn create_options(&self) -> ContainerCreateOptions {
        let mut ports: Vec<String> = self.ports.iter().map(|p| p.key()).collect();
        for key in &self.expose {
            if !ports.contains(key) {
                ports.push(key.clone());
            }
        }

        ContainerCreateOptions {
            image: Some(self.image.clone()),
            command: self.command.clone(),
            hostname: self.hostname.clone(),
            user: self.user.clone(),
            detach: false,
            stdin_open: self.stdin_open,
            tty: self.tty,
            ports,
            environment: self
                .environment
                .iter()
                .map(|(k, v)| v.as_ref().map_or_else(|| k.clone(), |v| format!("{k}={v}")))
                .collect(),
            volumes: self.volumes.iter().map(|v| v.target.clone()).collect(),
            network_disabled: false,
            entrypoint: self.entrypoint.clone(),
            working_dir: self.working_dir.clone(),
            domainname: self.domainname.clone(),
            host_config: self.host_config(),
            mac_address: self.mac_address.clone(),
            labels: self
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            stop_signal: self.stop_signal.clone(),
            networking_config: self.networking_config(),
            healthcheck: self.healthcheck.as_ref().map(healthcheck_json),
            stop_timeout: self.stop_timeout,
            runtime: self.runtime.clone(),
        }
    }

    fn host_config(&self) -> Map<String, Value> {
        let mut port_bindings = Map::new();
        for port in &self.ports {
            let mut binding = Map::new();
            if let Some(ip) = &port.host_ip {
                let _ = binding.insert("HostIp".into(), json!(ip));
            }
            let _ = binding.insert(
                "HostPort".into(),
                json!(port.host_port.clone().unwrap_or_default()),
            );
            let entry = port_bindings
                .entry(port.key())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.push(Value::Object(binding));
            }
        }

        let binds: Vec<String> = self.volumes.iter().filter_map(|v| v.bind()).collect();
        let devices: Vec<Value> = self
            .devices
            .iter()
            .map(String::as_str)
            .map(device_json)
            .collect();

        let mut host = Map::new();
        let _ = host.insert("NetworkMode".into(), json!(self.network_mode.engine_value()));
        if let Some(restart) = &self.restart {
            let _ = host.insert("RestartPolicy".into(), restart_policy_json(restart));
        }
        let _ = host.insert("PortBindings".into(), Value::Object(port_bindings));
        let _ = host.insert("Binds".into(), json!(binds));
        let _ = host.insert("Privileged".into(), json!(self.privileged));
        let _ = host.insert("CapAdd".into(), json!(self.cap_add));
        let _ = host.insert("CapDrop".into(), json!(self.cap_drop));
        let _ = host.insert("Devices".into(), Value::Array(devices));
        let _ = host.insert("Dns".into(), json!(self.dns));
        let _ = host.insert("ExtraHosts".into(), json!(self.extra_hosts));
        let _ = host.insert("Memory".into(), json!(self.mem_limit.unwrap_or(0)));
        let _ = host.insert("ShmSize".into(), json!(self.shm_size.unwrap_or(0)));
        let _ = host.insert("Init".into(), json!(self.init));
        host
    }

    fn networking_config(&self) -> Option<Value> {
        let NetworkMode::Network(network) = &self.network_mode else {
            return None;
        };
        let mut aliases = vec![self.name.clone()];
        aliases.extend(self.aliases.iter().cloned());
        Some(json!({
            "EndpointsConfig": {
                network.as_str(): { "Aliases": aliases }
            }
        }))
    }
}

/// `no`, `always`, `unless-stopped`, `on-failure[:N]`.
fn restart_policy_json(restart: &str) -> Value {
    let (name, retries) = match restart.split_once(':') {
        Some((name, count)) => (name, count.trim().parse::<u64>().unwrap_or(0)),
        None => (restart, 0),
    };
    json!({ "Name": name, "MaximumRetryCount": retries })
}

/// `host[:container[:permissions]]`.
fn device_json(spec: &str) -> Value {
    let mut parts = spec.splitn(3, ':');
    let host = parts.next().unwrap_or_default();
    let container = parts.next().filter(|c| !c.is_empty()).unwrap_or(host);
    let permissions = parts.next().unwrap_or("rwm");
    json!({
        "PathOnHost": host,
        "PathInContainer": container,
        "CgroupPermissions": permissions,
    })
}

fn healthcheck_json(hc: &Healthcheck) -> Value {
    let mut out = Map::new();
    let _ = out.insert("Test".into(), json!(hc.test));
    if let Some(v) = hc.interval {
        let _ = out.insert("Interval".into(), json!(v));
    }
    if let Some(v) = hc.timeout {
        let _ = out.insert("Timeout".into(), json!(v));
    }
    if let Some(v) = hc.start_period {
        let _ = out.insert("StartPeriod".into(), json!(v));
    }
    if let Some(v) = hc.retries {
        let _ = out.insert("Retries".into(), json!(v));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::interpolate::Environment;
    use crate::project::Project;

    fn service(yaml: &str) -> Service {
        let project = Project::from_yaml(
            &format!("name: demo\nservices:\n  web:\n{yaml}"),
            Path::new("/srv/demo"),
            &Environment::default(),
        )
        .expect("valid project");
        project.services[0].clone()
    }

    #[test]
    fn minimal_service_carries_image_and_default_network() {
        let opts = service("    image: nginx:latest\n").create_options();
        assert_eq!(opts.image.as_deref(), Some("nginx:latest"));
        assert_eq!(opts.host_config["NetworkMode"], json!("demo_default"));
        assert_eq!(
            opts.networking_config,
            Some(json!({"EndpointsConfig": {"demo_default": {"Aliases": ["web"]}}}))
        );
        assert!(!opts.detach);
    }

    #[test]
    fn published_ports_become_bindings_and_exposed_ports() {
        let opts = service("    image: x\n    ports: ['8080:80', '9000:9000/udp']\n    expose: [3000]\n")
            .create_options();
        assert_eq!(opts.ports, vec!["80/tcp", "9000/udp", "3000/tcp"]);
        assert_eq!(
            opts.host_config["PortBindings"]["80/tcp"],
            json!([{ "HostPort": "8080" }])
        );
    }

    #[test]
    fn restart_policy_carries_retry_count() {
        let opts = service("    image: x\n    restart: on-failure:5\n").create_options();
        assert_eq!(
            opts.host_config["RestartPolicy"],
            json!({"Name": "on-failure", "MaximumRetryCount": 5})
        );
    }

    #[test]
    fn restart_absent_leaves_no_policy() {
        let opts = service("    image: x\n").create_options();
        assert!(!opts.host_config.contains_key("RestartPolicy"));
    }

    #[test]
    fn devices_default_container_path_and_permissions() {
        let opts = service("    image: x\n    devices: ['/dev/ttyUSB0']\n").create_options();
        assert_eq!(
            opts.host_config["Devices"],
            json!([{
                "PathOnHost": "/dev/ttyUSB0",
                "PathInContainer": "/dev/ttyUSB0",
                "CgroupPermissions": "rwm"
            }])
        );
    }

    #[test]
    fn host_network_has_no_networking_config() {
        let opts = service("    image: x\n    network_mode: host\n").create_options();
        assert_eq!(opts.host_config["NetworkMode"], json!("host"));
        assert!(opts.networking_config.is_none());
    }

    #[test]
    fn environment_renders_key_value_and_bare() {
        let opts = service("    image: x\n    environment:\n      A: 1\n      B:\n").create_options();
        assert_eq!(opts.environment, vec!["A=1", "B"]);
    }

    #[test]
    fn volumes_split_into_paths_and_binds() {
        let opts =
            service("    image: x\n    volumes: ['./data:/data', '/cache']\n").create_options();
        assert_eq!(opts.volumes, vec!["/data", "/cache"]);
        assert_eq!(opts.host_config["Binds"], json!(["/srv/demo/data:/data:rw"]));
    }

    #[test]
    fn healthcheck_uses_engine_keys() {
        let opts = service(
            "    image: x\n    healthcheck:\n      test: [CMD, true]\n      timeout: 5s\n",
        )
        .create_options();
        assert_eq!(
            opts.healthcheck,
            Some(json!({"Test": ["CMD", "true"], "Timeout": 5_000_000_000_u64}))
        );
    }
}
