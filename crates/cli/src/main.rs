use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use ferry_api::ResourceEntry;
use ferry_controller::{Reconciler, Requeue};
use ferry_core::{Destination, ObjectKey};
use ferry_kubehub::KubeStore;
use ferry_oci::{Scheme, Transfer, TransferEngine};
use ferry_transport::TransportOptions;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ferryctl", version, about = "Snapshot component resources into the local registry")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Emit logs as JSON lines
    #[arg(long = "log-json", action = ArgAction::SetTrue, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug, Clone)]
struct RegistryOpts {
    /// Local registry host:port (pull proxy, push target, snapshot ref base)
    #[arg(long = "registry-addr", env = "FERRY_REGISTRY_ADDR")]
    registry_addr: String,

    /// Scheme for proxied blob pulls
    #[arg(long = "pull-scheme", env = "FERRY_PULL_SCHEME", default_value = "http")]
    pull_scheme: Scheme,

    /// Scheme for pushes to the local registry
    #[arg(long = "push-scheme", env = "FERRY_PUSH_SCHEME", default_value = "http")]
    push_scheme: Scheme,

    /// Whole-request deadline for proxied pulls
    #[arg(long = "http-timeout-secs", env = "FERRY_HTTP_TIMEOUT_SECS", default_value_t = 300)]
    http_timeout_secs: u64,
}

impl RegistryOpts {
    fn engine(&self) -> TransferEngine {
        let options = TransportOptions { timeout: Some(Duration::from_secs(self.http_timeout_secs)), ..Default::default() };
        TransferEngine::new(&self.registry_addr, self.pull_scheme, self.push_scheme, options)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the controller until SIGINT/SIGTERM
    Run {
        #[command(flatten)]
        registry: RegistryOpts,
        /// Only watch this namespace (default: all)
        #[arg(long = "namespace", env = "FERRY_NAMESPACE")]
        namespace: Option<String>,
    },
    /// Reconcile one Resource once and print the outcome
    Reconcile {
        namespace: String,
        name: String,
        #[command(flatten)]
        registry: RegistryOpts,
    },
    /// Transfer one artifact into the local registry, no cluster needed
    Transfer {
        #[command(flatten)]
        registry: RegistryOpts,
        /// Remote repository, e.g. ghcr.io/acme/app
        #[arg(long = "ref")]
        reference: String,
        /// Content digest, e.g. sha256:...
        #[arg(long = "digest")]
        digest: String,
        /// Resource version, used as the remote tag
        #[arg(long = "version")]
        version: String,
        /// Snapshot name under <registry>/snapshots/
        #[arg(long = "name")]
        name: String,
        /// Snapshot tag
        #[arg(long = "tag")]
        tag: String,
    },
    /// Print the CustomResourceDefinitions as a YAML stream
    Crd,
}

fn init_tracing(json: bool) {
    let env = std::env::var("FERRY_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json { fmt.json().init() } else { fmt.init() }
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("FERRY_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid FERRY_METRICS_ADDR; expected host:port");
        }
    }
}

fn requeue_json(requeue: Requeue) -> serde_json::Value {
    match requeue {
        Requeue::After(d) => serde_json::json!(d.as_secs()),
        Requeue::Never => serde_json::Value::Null,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    init_metrics();

    match cli.command {
        Commands::Run { registry, namespace } => {
            info!(registry = %registry.registry_addr, ns = ?namespace, pull = %registry.pull_scheme, push = %registry.push_scheme, "run invoked");
            let client = ferry_kubehub::get_kube_client().await?;
            let reconciler = Reconciler::new(KubeStore::new(client.clone()), registry.engine(), &registry.registry_addr);
            ferry_kubehub::run_controller(client, namespace.as_deref(), reconciler).await?;
        }
        Commands::Reconcile { namespace, name, registry } => {
            let key = ObjectKey::new(namespace, name);
            info!(resource = %key, "reconcile invoked");
            let client = ferry_kubehub::get_kube_client().await?;
            let reconciler = Reconciler::new(KubeStore::new(client), registry.engine(), &registry.registry_addr);
            let res = reconciler.reconcile(&key).await;
            match cli.output {
                Output::Human => match &res {
                    Ok(requeue) => println!("{}: converged, requeue {}", key, requeue),
                    Err(f) => eprintln!("{}: failed, requeue {}: {}", key, f.requeue, f.error),
                },
                Output::Json => {
                    let v = match &res {
                        Ok(requeue) => serde_json::json!({ "resource": key, "ok": true, "requeueSecs": requeue_json(*requeue) }),
                        Err(f) => serde_json::json!({ "resource": key, "ok": false, "requeueSecs": requeue_json(f.requeue), "error": f.error.to_string() }),
                    };
                    println!("{}", serde_json::to_string_pretty(&v)?);
                }
            }
            res?;
        }
        Commands::Transfer { registry, reference, digest, version, name, tag } => {
            let destination = Destination::new(&registry.registry_addr, &name, &tag);
            let entry = ResourceEntry {
                name: name.clone(),
                version,
                kind: None,
                access: serde_json::json!({ "globalAccess": { "ref": reference, "digest": digest } }),
            };
            info!(destination = %destination.reference(), "transfer invoked");
            let report = match registry.engine().transfer(destination.reference(), &entry).await {
                Ok(r) => r,
                Err(e) => {
                    error!(error = %e, "transfer failed");
                    return Err(e).context("transfer failed");
                }
            };
            match cli.output {
                Output::Human => {
                    println!("{} -> {}", report.remote, report.destination);
                    println!("layer {} ({} bytes)", report.layer_digest, report.bytes);
                    println!("snapshot ref {}", destination.snapshot_ref());
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Crd => {
            for crd in ferry_api::crds() {
                print!("---\n{}", serde_yaml::to_string(&crd).context("serializing CRD")?);
            }
        }
    }
    Ok(())
}
