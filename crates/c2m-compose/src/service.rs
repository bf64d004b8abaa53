//! Normalized service model.
//!
//! A [`Service`] is the resolver's read-only view of one Compose service:
//! every polymorphic field has been reduced to a single shape, relative
//! paths are absolute, and the network the service runs on is known.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use c2m_common::constants::{DEFAULT_DOCKERFILE, DEFAULT_NETWORK};
use c2m_common::error::{ConvertError, Result};
use c2m_common::types::ArgList;

use crate::interpolate::{Environment, read_env_file};
use crate::model::{
    ListOrMap, RawBuild, RawBuildSpec, RawHealthcheck, RawService, RawServiceNetworks, Scalar,
    StringOrList, scalar_value,
};
use crate::ports::{PortBinding, parse_expose, parse_port};
use crate::units::{nanos_to_secs, parse_bytes, parse_duration_nanos, split_command};
use crate::volumes::{VolumeContext, VolumeMount, normalize, parse_volume};

/// Build section of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Absolute build context directory.
    pub context: PathBuf,
    /// Dockerfile name relative to the context.
    pub dockerfile: String,
    /// Build arguments.
    pub args: ArgList,
    /// Cache source images, in order.
    pub cache_from: Vec<String>,
    /// Image labels.
    pub labels: ArgList,
    /// Shared memory size for build containers.
    pub shm_size: Option<String>,
    /// Build stage to stop at.
    pub target: Option<String>,
}

/// Network the service container joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    /// A user-defined or implicit project network, by engine name.
    Network(String),
    /// Host networking.
    Host,
    /// No networking.
    Disabled,
    /// Share another container's network stack.
    Container(String),
    /// Any other engine mode (`bridge`, ...).
    Other(String),
}

impl NetworkMode {
    /// Value of `HostConfig.NetworkMode`.
    #[must_use]
    pub fn engine_value(&self) -> String {
        match self {
            Self::Network(name) | Self::Other(name) => name.clone(),
            Self::Host => "host".into(),
            Self::Disabled => "none".into(),
            Self::Container(name) => format!("container:{name}"),
        }
    }

    /// Network name when the mode attaches to a named network.
    #[must_use]
    pub fn network_name(&self) -> Option<&str> {
        match self {
            Self::Network(name) => Some(name),
            _ => None,
        }
    }
}

/// Container healthcheck, durations in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Healthcheck {
    /// Probe command in engine form (`CMD-SHELL ...`, `CMD ...`, `NONE`).
    pub test: Vec<String>,
    /// Time between probes.
    pub interval: Option<u64>,
    /// Probe timeout.
    pub timeout: Option<u64>,
    /// Grace period after start.
    pub start_period: Option<u64>,
    /// Consecutive failures before unhealthy.
    pub retries: Option<u32>,
}

/// One resolved Compose service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Unique service name.
    pub name: String,
    /// Image reference the container runs.
    pub image: String,
    /// Build section, if the service builds its image locally.
    pub build: Option<BuildSpec>,
    /// Command override.
    pub command: Vec<String>,
    /// Entrypoint override.
    pub entrypoint: Vec<String>,
    /// Environment variables; `None` values are passed by name only.
    pub environment: Vec<(String, Option<String>)>,
    /// Published ports.
    pub ports: Vec<PortBinding>,
    /// Exposed-only ports as engine keys.
    pub expose: Vec<String>,
    /// Volume mounts.
    pub volumes: Vec<VolumeMount>,
    /// Container labels.
    pub labels: Vec<(String, String)>,
    /// Network the container joins.
    pub network_mode: NetworkMode,
    /// DNS aliases on the primary network.
    pub aliases: Vec<String>,
    /// Restart policy as written.
    pub restart: Option<String>,
    /// Container hostname.
    pub hostname: Option<String>,
    /// Container domain name.
    pub domainname: Option<String>,
    /// User to run as.
    pub user: Option<String>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Signal used to stop the container.
    pub stop_signal: Option<String>,
    /// Seconds to wait before killing on stop.
    pub stop_timeout: Option<u64>,
    /// Container healthcheck.
    pub healthcheck: Option<Healthcheck>,
    /// OCI runtime name.
    pub runtime: Option<String>,
    /// Keep stdin open.
    pub stdin_open: bool,
    /// Allocate a TTY.
    pub tty: bool,
    /// Run privileged.
    pub privileged: bool,
    /// Run an init process.
    pub init: bool,
    /// Added kernel capabilities.
    pub cap_add: Vec<String>,
    /// Dropped kernel capabilities.
    pub cap_drop: Vec<String>,
    /// Device mappings as written (`host[:container[:perms]]`).
    pub devices: Vec<String>,
    /// Custom DNS servers.
    pub dns: Vec<String>,
    /// Extra `/etc/hosts` entries (`host:ip`).
    pub extra_hosts: Vec<String>,
    /// Memory limit in bytes.
    pub mem_limit: Option<u64>,
    /// Size of `/dev/shm` in bytes.
    pub shm_size: Option<u64>,
}

/// Project-wide facts a service needs while being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Normalized project name.
    pub project: &'a str,
    /// Absolute project directory.
    pub directory: &'a Path,
    /// Interpolation and bare-variable environment.
    pub env: &'a Environment,
    /// Engine names of declared networks.
    pub networks: &'a BTreeMap<String, String>,
    /// Engine names of declared volumes with explicit names.
    pub volumes: &'a BTreeMap<String, String>,
}

impl ResolveContext<'_> {
    /// Engine name of the implicit default network.
    #[must_use]
    pub fn default_network(&self) -> String {
        self.network_engine_name(DEFAULT_NETWORK)
    }

    fn network_engine_name(&self, name: &str) -> String {
        self.networks
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{}_{name}", self.project))
    }
}

impl Service {
    /// Normalizes one raw service definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the service has neither image nor build section,
    /// or if any field cannot be parsed.
    pub fn resolve(name: &str, raw: RawService, ctx: &ResolveContext<'_>) -> Result<Self> {
        tracing::debug!(service = name, "resolving service");

        let build = raw.build.map(|b| resolve_build(b, ctx));
        let image = match (raw.image, &build) {
            (Some(image), _) => image,
            (None, Some(_)) => format!("{}_{name}", ctx.project),
            (None, None) => {
                return Err(ConvertError::Config {
                    message: format!(
                        "service \"{name}\" has neither an image nor a build context specified"
                    ),
                });
            }
        };

        let mut ports = Vec::new();
        for port in &raw.ports {
            ports.extend(parse_port(port)?);
        }
        let mut expose = Vec::new();
        for port in &raw.expose {
            expose.extend(parse_expose(port)?);
        }

        let home = ctx.env.get("HOME");
        let volume_ctx = VolumeContext {
            project: ctx.project,
            directory: ctx.directory,
            home,
            named: ctx.volumes,
        };
        let volumes = raw
            .volumes
            .iter()
            .map(|v| parse_volume(v, &volume_ctx))
            .collect::<Result<Vec<_>>>()?;

        let (network_mode, aliases) =
            resolve_network(raw.network_mode.as_deref(), raw.networks, ctx);

        Ok(Self {
            name: name.to_string(),
            image,
            build,
            command: command_words(raw.command)?,
            entrypoint: command_words(raw.entrypoint)?,
            environment: resolve_environment(raw.env_file, raw.environment, ctx)?,
            ports,
            expose,
            volumes,
            labels: raw.labels.map(label_pairs).unwrap_or_default(),
            network_mode,
            aliases,
            restart: raw.restart,
            hostname: raw.hostname,
            domainname: raw.domainname,
            user: raw.user.map(|u| u.to_string()),
            working_dir: raw.working_dir,
            mac_address: raw.mac_address,
            stop_signal: raw.stop_signal,
            stop_timeout: raw
                .stop_grace_period
                .as_ref()
                .map(duration_nanos)
                .transpose()?
                .map(nanos_to_secs),
            healthcheck: raw.healthcheck.map(resolve_healthcheck).transpose()?,
            runtime: raw.runtime,
            stdin_open: raw.stdin_open,
            tty: raw.tty,
            privileged: raw.privileged,
            init: raw.init,
            cap_add: raw.cap_add,
            cap_drop: raw.cap_drop,
            devices: raw.devices,
            dns: raw.dns.map(StringOrList::into_vec).unwrap_or_default(),
            extra_hosts: raw.extra_hosts.map(extra_host_entries).unwrap_or_default(),
            mem_limit: raw.mem_limit.as_ref().map(byte_size).transpose()?,
            shm_size: raw.shm_size.as_ref().map(byte_size).transpose()?,
        })
    }

    /// Returns `true` if the service builds its image from a local context.
    #[must_use]
    pub const fn has_build(&self) -> bool {
        self.build.is_some()
    }
}

fn resolve_build(raw: RawBuild, ctx: &ResolveContext<'_>) -> BuildSpec {
    let spec = match raw {
        RawBuild::Context(context) => RawBuildSpec {
            context: Some(context),
            ..RawBuildSpec::default()
        },
        RawBuild::Spec(spec) => spec,
    };
    let context = spec.context.unwrap_or_else(|| ".".into());
    BuildSpec {
        context: normalize(&ctx.directory.join(context)),
        dockerfile: spec
            .dockerfile
            .unwrap_or_else(|| DEFAULT_DOCKERFILE.to_string()),
        args: spec.args.map(|a| arg_list(a, ctx.env)).unwrap_or_default(),
        cache_from: spec.cache_from.unwrap_or_default(),
        labels: spec.labels.map(|l| arg_list(l, ctx.env)).unwrap_or_default(),
        shm_size: spec.shm_size.map(|s| s.to_string()),
        target: spec.target,
    }
}

/// Mapping entries keep their order; a `null` value is looked up in the
/// environment and falls back to an empty string.
fn arg_list(raw: ListOrMap, env: &Environment) -> ArgList {
    match raw {
        ListOrMap::List(items) => ArgList::Bare(items.iter().map(ToString::to_string).collect()),
        ListOrMap::Map(map) => ArgList::KeyValue(
            map.iter()
                .filter_map(|(k, v)| {
                    let key = scalar_value(k)?;
                    let value = scalar_value(v)
                        .or_else(|| env.get(&key).map(ToString::to_string))
                        .unwrap_or_default();
                    Some((key, value))
                })
                .collect(),
        ),
    }
}

fn label_pairs(raw: ListOrMap) -> Vec<(String, String)> {
    match raw {
        ListOrMap::List(items) => items
            .iter()
            .map(|item| {
                let item = item.to_string();
                match item.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (item, String::new()),
                }
            })
            .collect(),
        ListOrMap::Map(map) => map
            .iter()
            .filter_map(|(k, v)| Some((scalar_value(k)?, scalar_value(v).unwrap_or_default())))
            .collect(),
    }
}

fn extra_host_entries(raw: ListOrMap) -> Vec<String> {
    match raw {
        ListOrMap::List(items) => items.iter().map(ToString::to_string).collect(),
        ListOrMap::Map(map) => map
            .iter()
            .filter_map(|(k, v)| Some(format!("{}:{}", scalar_value(k)?, scalar_value(v)?)))
            .collect(),
    }
}

fn command_words(raw: Option<StringOrList>) -> Result<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(StringOrList::Str(s)) => split_command(&s),
        Some(list @ StringOrList::List(_)) => Ok(list.into_vec()),
    }
}

fn resolve_environment(
    env_file: Option<StringOrList>,
    environment: Option<ListOrMap>,
    ctx: &ResolveContext<'_>,
) -> Result<Vec<(String, Option<String>)>> {
    let mut vars: Vec<(String, Option<String>)> = Vec::new();
    let mut set = |key: String, value: Option<String>| {
        let value = value.or_else(|| ctx.env.get(&key).map(ToString::to_string));
        match vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => vars.push((key, value)),
        }
    };

    for file in env_file.map(StringOrList::into_vec).unwrap_or_default() {
        let path = ctx.directory.join(&file);
        if !path.is_file() {
            return Err(ConvertError::NotFound {
                kind: "env_file",
                id: path.display().to_string(),
            });
        }
        for (k, v) in read_env_file(&path)? {
            set(k, Some(v));
        }
    }

    match environment {
        None => {}
        Some(ListOrMap::List(items)) => {
            for item in items {
                let item = item.to_string();
                match item.split_once('=') {
                    Some((k, v)) => set(k.to_string(), Some(v.to_string())),
                    None => set(item, None),
                }
            }
        }
        Some(ListOrMap::Map(map)) => {
            for (k, v) in &map {
                if let Some(key) = scalar_value(k) {
                    set(key, scalar_value(v));
                }
            }
        }
    }
    Ok(vars)
}

fn resolve_network(
    network_mode: Option<&str>,
    networks: Option<RawServiceNetworks>,
    ctx: &ResolveContext<'_>,
) -> (NetworkMode, Vec<String>) {
    if let Some(mode) = network_mode {
        let resolved = match mode {
            "host" => NetworkMode::Host,
            "none" => NetworkMode::Disabled,
            other => {
                if let Some(service) = other.strip_prefix("service:") {
                    NetworkMode::Container(format!("{}_{service}_1", ctx.project))
                } else if let Some(container) = other.strip_prefix("container:") {
                    NetworkMode::Container(container.to_string())
                } else {
                    NetworkMode::Other(other.to_string())
                }
            }
        };
        return (resolved, Vec::new());
    }

    let mut attached: Vec<(String, i64, Vec<String>)> = match networks {
        None => Vec::new(),
        Some(RawServiceNetworks::List(names)) => {
            names.into_iter().map(|n| (n, 0, Vec::new())).collect()
        }
        Some(RawServiceNetworks::Map(map)) => map
            .into_iter()
            .map(|(n, settings)| {
                let settings = settings.unwrap_or_default();
                (n, settings.priority, settings.aliases)
            })
            .collect(),
    };
    attached.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    match attached.into_iter().next() {
        Some((name, _, aliases)) => (NetworkMode::Network(ctx.network_engine_name(&name)), aliases),
        None => (NetworkMode::Network(ctx.default_network()), Vec::new()),
    }
}

fn resolve_healthcheck(raw: RawHealthcheck) -> Result<Healthcheck> {
    if raw.disable {
        return Ok(Healthcheck {
            test: vec!["NONE".into()],
            ..Healthcheck::default()
        });
    }
    let test = match raw.test {
        None => Vec::new(),
        Some(StringOrList::Str(cmd)) => vec!["CMD-SHELL".into(), cmd],
        Some(list @ StringOrList::List(_)) => list.into_vec(),
    };
    Ok(Healthcheck {
        test,
        interval: raw.interval.as_ref().map(duration_nanos).transpose()?,
        timeout: raw.timeout.as_ref().map(duration_nanos).transpose()?,
        start_period: raw.start_period.as_ref().map(duration_nanos).transpose()?,
        retries: raw.retries,
    })
}

fn duration_nanos(raw: &Scalar) -> Result<u64> {
    match raw {
        Scalar::Int(secs) => Ok(u64::try_from(*secs).unwrap_or(0).saturating_mul(1_000_000_000)),
        other => parse_duration_nanos(&other.to_string()),
    }
}

fn byte_size(raw: &Scalar) -> Result<u64> {
    match raw {
        Scalar::Int(bytes) => Ok(u64::try_from(*bytes).unwrap_or(0)),
        other => parse_bytes(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        env: Environment,
        networks: BTreeMap<String, String>,
        volumes: BTreeMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                env: Environment::from_pairs([("SECRET", "s3cr3t"), ("HOME", "/home/dev")]),
                networks: BTreeMap::from([("edge".to_string(), "edge-net".to_string())]),
                volumes: BTreeMap::new(),
            }
        }

        fn resolve(&self, name: &str, yaml: &str) -> Result<Service> {
            let raw: RawService = serde_yaml::from_str(yaml).expect("valid yaml");
            let ctx = ResolveContext {
                project: "demo",
                directory: Path::new("/srv/demo"),
                env: &self.env,
                networks: &self.networks,
                volumes: &self.volumes,
            };
            Service::resolve(name, raw, &ctx)
        }
    }

    #[test]
    fn image_only_service_uses_default_network() {
        let svc = Fixture::new().resolve("web", "image: nginx:latest").expect("ok");
        assert_eq!(svc.image, "nginx:latest");
        assert!(svc.build.is_none());
        assert_eq!(svc.network_mode, NetworkMode::Network("demo_default".into()));
    }

    #[test]
    fn service_without_image_or_build_is_rejected() {
        let err = Fixture::new().resolve("x", "command: echo").expect_err("must fail");
        assert!(err.to_string().contains("neither an image nor a build"));
    }

    #[test]
    fn build_short_form_defaults_dockerfile() {
        let svc = Fixture::new().resolve("app", "build: ./app").expect("ok");
        let build = svc.build.expect("build");
        assert_eq!(build.context, PathBuf::from("/srv/demo/app"));
        assert_eq!(build.dockerfile, "Dockerfile");
        assert!(build.args.is_empty());
        assert_eq!(svc.image, "demo_app");
    }

    #[test]
    fn build_args_keep_form_and_order() {
        let svc = Fixture::new()
            .resolve(
                "app",
                "build:\n  context: .\n  args:\n    Z: 1\n    A: two\n    SECRET:\n  labels:\n    - com.example=1\n",
            )
            .expect("ok");
        let build = svc.build.expect("build");
        assert_eq!(
            build.args,
            ArgList::KeyValue(vec![
                ("Z".into(), "1".into()),
                ("A".into(), "two".into()),
                ("SECRET".into(), "s3cr3t".into()),
            ])
        );
        assert_eq!(build.labels, ArgList::Bare(vec!["com.example=1".into()]));
    }

    #[test]
    fn string_command_is_shell_split() {
        let svc = Fixture::new()
            .resolve("web", "image: x\ncommand: python app.py --name 'a b'")
            .expect("ok");
        assert_eq!(svc.command, vec!["python", "app.py", "--name", "a b"]);
    }

    #[test]
    fn environment_bare_keys_resolve_from_env() {
        let svc = Fixture::new()
            .resolve("web", "image: x\nenvironment:\n  - A=1\n  - SECRET\n  - UNSET\n")
            .expect("ok");
        assert_eq!(
            svc.environment,
            vec![
                ("A".into(), Some("1".into())),
                ("SECRET".into(), Some("s3cr3t".into())),
                ("UNSET".into(), None),
            ]
        );
    }

    #[test]
    fn declared_network_is_primary() {
        let svc = Fixture::new()
            .resolve("web", "image: x\nnetworks:\n  back:\n  edge:\n    priority: 10\n    aliases: [api]\n")
            .expect("ok");
        assert_eq!(svc.network_mode, NetworkMode::Network("edge-net".into()));
        assert_eq!(svc.aliases, vec!["api"]);
    }

    #[test]
    fn network_mode_service_points_at_container() {
        let svc = Fixture::new()
            .resolve("web", "image: x\nnetwork_mode: service:db")
            .expect("ok");
        assert_eq!(svc.network_mode.engine_value(), "container:demo_db_1");
    }

    #[test]
    fn healthcheck_string_test_uses_shell() {
        let svc = Fixture::new()
            .resolve(
                "web",
                "image: x\nhealthcheck:\n  test: curl -f http://localhost\n  interval: 30s\n  retries: 3\n",
            )
            .expect("ok");
        let hc = svc.healthcheck.expect("healthcheck");
        assert_eq!(hc.test, vec!["CMD-SHELL", "curl -f http://localhost"]);
        assert_eq!(hc.interval, Some(30_000_000_000));
        assert_eq!(hc.retries, Some(3));
    }

    #[test]
    fn sizes_and_grace_period_are_parsed() {
        let svc = Fixture::new()
            .resolve("web", "image: x\nmem_limit: 256m\nshm_size: 1024\nstop_grace_period: 1m\n")
            .expect("ok");
        assert_eq!(svc.mem_limit, Some(256 * 1024 * 1024));
        assert_eq!(svc.shm_size, Some(1024));
        assert_eq!(svc.stop_timeout, Some(60));
    }

    #[test]
    fn missing_env_file_is_not_found() {
        let err = Fixture::new()
            .resolve("web", "image: x\nenv_file: missing.env\n")
            .expect_err("must fail");
        assert!(matches!(err, ConvertError::NotFound { kind: "env_file", .. }));
    }
}
