use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use records_core::{api::ProcessingStarted, Record, RecordDraft, RecordId};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Parser, Debug)]
#[command(name = "recordctl", about = "Command-line client for the records daemon")]
struct Args {
    /// Base URL of the daemon.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    daemon: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    List,
    Get {
        #[arg(long)]
        id: RecordId,
    },
    Create {
        #[command(flatten)]
        fields: DraftArgs,
    },
    /// Replace every field of an existing record.
    Update {
        #[arg(long)]
        id: RecordId,
        #[command(flatten)]
        fields: DraftArgs,
    },
    Delete {
        #[arg(long)]
        id: RecordId,
    },
    /// Run a batch and wait for the processed records.
    Process,
    /// Start a batch without waiting for it.
    ProcessAsync,
}

#[derive(clap::Args, Debug)]
struct DraftArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

impl From<DraftArgs> for RecordDraft {
    fn from(a: DraftArgs) -> Self {
        RecordDraft {
            name: Some(a.name),
            description: a.description,
            status: a.status,
            email: Some(a.email),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();
    let base = format!("{}/api/records", args.daemon.trim_end_matches('/'));

    match args.cmd {
        Cmd::List => {
            let resp = client.get(&base).send().await?;
            print_json(&decode::<Vec<Record>>(resp).await?)?;
        }
        Cmd::Get { id } => {
            let resp = client.get(format!("{base}/{id}")).send().await?;
            print_json(&decode::<Record>(resp).await?)?;
        }
        Cmd::Create { fields } => {
            let draft = RecordDraft::from(fields);
            let resp = client.post(&base).json(&draft).send().await?;
            print_json(&decode::<Record>(resp).await?)?;
        }
        Cmd::Update { id, fields } => {
            let draft = RecordDraft::from(fields);
            let resp = client
                .put(format!("{base}/{id}"))
                .json(&draft)
                .send()
                .await?;
            print_json(&decode::<Record>(resp).await?)?;
        }
        Cmd::Delete { id } => {
            let resp = client.delete(format!("{base}/{id}")).send().await?;
            ensure_success(resp).await?;
            println!("deleted record {id}");
        }
        Cmd::Process => {
            let resp = client.get(format!("{base}/process")).send().await?;
            print_json(&decode::<Vec<Record>>(resp).await?)?;
        }
        Cmd::ProcessAsync => {
            let resp = client.get(format!("{base}/process-async")).send().await?;
            print_json(&decode::<ProcessingStarted>(resp).await?)?;
        }
    }

    Ok(())
}

/// Fail with the daemon's error body on any non-2xx status.
async fn ensure_success(resp: reqwest::Response) -> anyhow::Result<String> {
    let status = resp.status();
    let body = resp.text().await.context("read response body")?;
    if !status.is_success() {
        bail!("daemon returned {status}: {body}");
    }
    Ok(body)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let body = ensure_success(resp).await?;
    serde_json::from_str(&body).context("parse response json")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
