use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use iam_inventory::config::{Settings, DEFAULT_OUTPUT_FILE};
use iam_inventory::gcp::{
    AmbientCredentials, CredentialDiscovery, GcpClient, OAuthTokenProvider, ResourceDirectory, StaticTokenProvider,
    TokenProvider, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT,
};
use iam_inventory::inventory::{Aggregator, HierarchyWalker};
use iam_inventory::output::{self, ExportOutcome};
use iam_inventory::ConfigurationError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dumps all members roles and permissions for a GCP organization", long_about = None)]
struct Cli {
    #[command(flatten)]
    export: ExportArgs,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the organizations visible to the caller
    Organizations,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// CSV file output
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    file: PathBuf,
    /// Organization ID
    #[arg(short = 'o', long = "org", env = "IAM_INVENTORY_ORG_ID")]
    org: Option<String>,
    /// Project ID, used to find the Org ID if unspecified
    #[arg(short = 'p', long, env = "IAM_INVENTORY_PROJECT_ID")]
    project: Option<String>,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// credentials.json, used to authenticate and to find the Org ID if Org ID and Project ID are unspecified
    #[arg(short = 'c', long, env = "GOOGLE_APPLICATION_DEFAULT", global = true)]
    credentials: Option<PathBuf>,
    /// OAuth access token to use instead of exchanging credentials
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,
    #[arg(long, env = "IAM_INVENTORY_RESOURCE_MANAGER_ENDPOINT", default_value = DEFAULT_RESOURCE_MANAGER_ENDPOINT, global = true)]
    resource_manager_endpoint: String,
    #[arg(long, env = "IAM_INVENTORY_IAM_ENDPOINT", default_value = DEFAULT_IAM_ENDPOINT, global = true)]
    iam_endpoint: String,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            organization_id: self.export.org.clone(),
            project_id: self.export.project.clone(),
            credentials_path: self.connection.credentials.clone(),
            output_path: self.export.file.clone(),
            access_token: self.connection.access_token.clone(),
            resource_manager_endpoint: self.connection.resource_manager_endpoint.clone(),
            iam_endpoint: self.connection.iam_endpoint.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let started = Instant::now();
    let cli = Cli::parse();
    let settings = cli.settings().validate()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("iam-inventory/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build http client")?;
    let credentials = AmbientCredentials::from_env(http.clone());

    let result = match cli.command {
        Some(Commands::Organizations) => list_organizations(&settings, &http, &credentials).await,
        None => export(&settings, &http, &credentials).await,
    };

    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "total time");
    result
}

async fn export(settings: &Settings, http: &reqwest::Client, credentials: &AmbientCredentials) -> anyhow::Result<()> {
    if output::is_already_exported(&settings.output_path) {
        tracing::warn!(path = %settings.output_path.display(), "file found, skipping export");
        return Ok(());
    }

    tracing::info!(path = %settings.output_path.display(), "starting export");
    let client = Arc::new(build_client(settings, http, credentials).await?);

    let started = Instant::now();
    let walker = HierarchyWalker::new(client.clone());
    let (context, source) = walker
        .resolve_organization(&settings.organization_lookup(), credentials)
        .await
        .context("unable to identify the organization, specify --org or --project")?;
    tracing::info!(
        organization = %context.organization_id(),
        via = %source,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "organization resolved"
    );

    let mut aggregator = Aggregator::new(context, client.clone(), client.clone(), client);
    let rows = aggregator.collect_all().await?;

    let started = Instant::now();
    match output::export(&settings.output_path, &rows)? {
        ExportOutcome::Written(path) => tracing::info!(
            path = %path.display(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "csv written"
        ),
        ExportOutcome::Skipped(path) => tracing::warn!(path = %path.display(), "csv not written"),
    }

    Ok(())
}

async fn list_organizations(
    settings: &Settings,
    http: &reqwest::Client,
    credentials: &AmbientCredentials,
) -> anyhow::Result<()> {
    let client = build_client(settings, http, credentials).await?;
    let organizations = client
        .list_organizations()
        .await
        .context("failed to list organizations")?;

    for org in &organizations {
        println!("{}\t{}", org.id(), org.display_name);
    }
    tracing::info!(count = organizations.len(), "organizations listed");
    Ok(())
}

async fn build_client(settings: &Settings, http: &reqwest::Client, credentials: &AmbientCredentials) -> anyhow::Result<GcpClient> {
    let tokens = token_provider(settings, http, credentials).await?;
    Ok(GcpClient::new(http.clone(), tokens, settings.endpoints()))
}

/// An explicit access token wins, then the credentials file, then application
/// default credentials.
async fn token_provider(
    settings: &Settings,
    http: &reqwest::Client,
    credentials: &AmbientCredentials,
) -> anyhow::Result<Arc<dyn TokenProvider>> {
    if let Some(token) = settings.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        tracing::info!("using access token from the command line");
        return Ok(Arc::new(StaticTokenProvider::new(token.trim())));
    }

    let discovered = match &settings.credentials_path {
        Some(path) => credentials.credentials_from_file(path).await,
        None => credentials.default_credentials().await,
    }
    .map_err(ConfigurationError::from)
    .context("unable to find credentials to authenticate with")?;

    tracing::info!(origin = %discovered.origin, "authenticating");
    Ok(Arc::new(OAuthTokenProvider::new(discovered, http.clone())))
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
