use std::env;

use anyhow::{bail, Context};
use discord_webhook::{ClientConfig, ExecuteParams, MessagePayload, WebhookClient, WebhookFile};
use log::{error, info};

const USAGE: &str = "usage: discord-webhook [--file PATH]... [--thread ID] [--no-wait] <content>";

struct Args {
    content: Vec<String>,
    files: Vec<String>,
    thread_id: Option<String>,
    wait: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        content: vec![],
        files: vec![],
        thread_id: None,
        wait: true,
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--file" => args.files.push(iter.next().context(USAGE)?),
            "--thread" => args.thread_id = Some(iter.next().context(USAGE)?),
            "--no-wait" => args.wait = false,
            "-h" | "--help" => bail!(USAGE),
            _ => args.content.push(arg),
        }
    }
    Ok(args)
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    let config = ClientConfig::from_env()?;
    let client = WebhookClient::from_config(config)?;

    let mut payload = MessagePayload::new();
    if !args.content.is_empty() {
        payload = payload.content(args.content.join(" "));
    }
    for path in &args.files {
        let file = WebhookFile::open(path).with_context(|| format!("Could not open {}", path))?;
        payload = payload.file(file);
    }

    let params = ExecuteParams {
        wait: args.wait,
        thread_id: args.thread_id,
        with_components: false,
    };
    match client.execute(payload, &params).await? {
        Some(message) => info!("Sent message {} to channel {}", message.id, message.channel_id),
        None => info!("Sent message to webhook {}", client.id()),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    better_panic::install();
    env_logger::init();

    if let Err(err) = run().await {
        error!("{:?}", err);
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}
