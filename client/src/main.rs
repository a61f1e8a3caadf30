#![deny(unused_must_use, deprecated)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use anyhow::Context;
use tokio::time;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use ws2p::{
    Ed25519Verifier, HandshakeConfig, OsRandomness, Request, Response, ResponseBody, SessionClient,
};

use crate::config::Config;

mod config;
mod defaults;
mod endpoint;
mod identity;
mod net;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    let keys = identity::load_keys(&config)?;

    let url = config.endpoint.url();
    let transport = net::websocket_connect(&url)
        .await
        .with_context(|| format!("unable to connect to {}", config.endpoint))?;

    let mut session = SessionClient::new(
        transport,
        HandshakeConfig::new(&config.currency),
        Arc::new(keys),
        Arc::new(Ed25519Verifier),
        Box::new(OsRandomness),
    );

    match time::timeout(config.handshake_timeout, session.handshake()).await {
        Ok(result) => result.context("handshake failed")?,
        Err(_) => return Err(ws2p::Error::HandshakeTimeout).context("handshake failed"),
    }

    for request in demo_requests() {
        match time::timeout(config.response_timeout, session.request(&request)).await {
            Ok(Ok(response)) => print_response(&request, &response),
            Ok(Err(e)) => {
                error!(request = request.name(), error = %e, "query failed");
                if !session.is_established() {
                    break;
                }
            }
            // a late answer is skipped by the next query, its id no longer matches
            Err(_) => warn!(request = request.name(), "no answer in time"),
        }
    }

    session.into_transport().done().await?;

    Ok(())
}

fn demo_requests() -> [Request; 4] {
    [
        Request::Current {},
        Request::BlockByNumber {
            number: defaults::DEMO_BLOCK_NUMBER,
        },
        Request::BlocksChunk {
            from_number: defaults::DEMO_BLOCK_NUMBER,
            count: defaults::DEMO_CHUNK_SIZE,
        },
        Request::WotRequirementsOfPending {
            min_cert: defaults::DEMO_MIN_CERT,
        },
    ]
}

fn print_response(request: &Request, response: &Response) {
    let name = request.name();

    match response {
        Response::Error { message, .. } => {
            println!("{name}: node answered with an error: {message}");
        }
        Response::Success {
            body: ResponseBody::Block(block),
            ..
        } => {
            println!(
                "{name}: block #{} {} ({} members)",
                block.number, block.hash, block.members_count
            );
        }
        Response::Success {
            body: ResponseBody::Blocks(blocks),
            ..
        } => {
            println!("{name}: {} blocks", blocks.len());
            for block in blocks {
                println!("  #{} {}", block.number, block.hash);
            }
        }
        Response::Success {
            body: ResponseBody::Requirements(requirements),
            ..
        } => {
            println!("{name}: {} pending identities", requirements.identities.len());
            for identity in &requirements.identities {
                println!(
                    "  {} ({}): {} certifications, {} pending",
                    identity.uid,
                    identity.pubkey,
                    identity.certifications.len(),
                    identity.pending_certs.len()
                );
            }
        }
    }
}
