use std::path::Path;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{Api, Client};
use tracing::{error, info};

use crd_upgrade_safety::{CrdUpgradeSafety, Preflight, Release};

const USAGE: &str = "usage: crd-upgrade-safety <manifest.yaml> [release-name]";

/// Check a rendered release manifest against the CRDs active in the cluster
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crd_upgrade_safety=info".parse()?)
                .add_directive("kube=warn".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let manifest_path = args.next().ok_or(USAGE)?;
    let release_name = args
        .next()
        .or_else(|| std::env::var("RELEASE_NAME").ok())
        .unwrap_or_else(|| {
            Path::new(&manifest_path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "release".to_string())
        });

    let manifest = tokio::fs::read_to_string(&manifest_path).await?;
    let release = Release::new(release_name, manifest);

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let preflight = CrdUpgradeSafety::new(crds);

    match preflight.upgrade(&release).await {
        Ok(()) => {
            info!(release = %release.name, "Upgrade is safe");
            Ok(())
        }
        Err(e) => {
            for line in e.to_string().lines() {
                error!("{}", line);
            }
            std::process::exit(1);
        }
    }
}
