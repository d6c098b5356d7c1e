use anyhow::Context;
use clap::Parser;
use ferrumkv::client::Client;
use ferrumkv::config::DEFAULT_ADDR;
use ferrumkv::protocol::Request;

/// Send one command to a FerrumKV server and print the reply
#[derive(Parser, Debug)]
#[command(name = "client", version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Command and arguments, e.g. `set key value`
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut client = Client::connect(&cli.addr)
        .await
        .with_context(|| format!("cannot reach {}", cli.addr))?;

    let response = client.query(&Request::from_args(cli.args)).await?;

    println!("({}) {}", response.status, String::from_utf8_lossy(&response.body));
    Ok(())
}
