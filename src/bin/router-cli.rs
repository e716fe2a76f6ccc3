use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the KIE Server Router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Registration {
    /// Container id, e.g. test1.0
    #[arg(long)]
    container_id: String,
    /// Alias; defaults to the artifact id of the release
    #[arg(long, default_value = "")]
    alias: String,
    /// Release coordinates group:artifact:version
    #[arg(long)]
    release_id: String,
    #[arg(long)]
    server_id: String,
    #[arg(long)]
    server_url: String,
}

impl Registration {
    fn to_json(&self) -> Value {
        json!({
            "containerId": self.container_id,
            "alias": self.alias,
            "releaseId": self.release_id,
            "serverId": self.server_id,
            "serverUrl": self.server_url,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and registry sizes
    Status,
    /// Dump the whole registry
    List,
    /// Register a container deployed on a server
    Add(Registration),
    /// Deregister a container from a server
    Remove(Registration),
    /// Report a host as unavailable
    Unavailable { url: String },
    /// Hosts serving a container id or alias
    ContainerHosts { id: String },
    /// Hosts registered for a server id
    ServerHosts { id: String },
    /// Container infos for an alias
    Aliases { alias: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/mgmt/status", base)),
        Commands::List => client.get(format!("{}/mgmt/list", base)),
        Commands::Add(registration) => client
            .post(format!("{}/mgmt/add", base))
            .json(&registration.to_json()),
        Commands::Remove(registration) => client
            .post(format!("{}/mgmt/remove", base))
            .json(&registration.to_json()),
        Commands::Unavailable { url } => client
            .post(format!("{}/mgmt/unavailable", base))
            .json(&json!({ "url": url })),
        Commands::ContainerHosts { id } => client.get(format!("{}/mgmt/containers/{}/hosts", base, id)),
        Commands::ServerHosts { id } => client.get(format!("{}/mgmt/servers/{}/hosts", base, id)),
        Commands::Aliases { alias } => client.get(format!("{}/mgmt/aliases/{}/containers", base, alias)),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: management API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
