//! A minimal EPP server wired with the content router.
//!
//! Run with a settings file pointing at your TLS material:
//!
//! ```text
//! cargo run --example server -- --config config.toml
//! ```
//!
//! The handlers here respond with canned result codes; a real registry
//! backend would authenticate the registrar in `login` and query its
//! object store in `check`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use epp_server::{
    handler_fn, ClientAuth, Mux, Server, ServerConfig, SessionConfig, SessionInfo, Settings,
    TlsConfig, WellFormed,
};
use epp_wire::{
    encode, server_xml_attributes, Greeting, NamespaceAliases, Response, ResultCode, NS_CONTACT,
    NS_DOMAIN, NS_HOST,
};

#[derive(Parser)]
#[command(about = "Example EPP server")]
struct Args {
    /// Path to the TOML settings file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

const SERVER_ID: &str = "epp.example.test";

fn respond(code: ResultCode) -> Result<Bytes, epp_server::BoxError> {
    let response = Response::from_code(code)
        .with_transaction(None, uuid::Uuid::new_v4().to_string());
    let document = encode(
        &response,
        &server_xml_attributes(),
        &NamespaceAliases::default(),
    )?;
    Ok(Bytes::from(document))
}

fn build_mux() -> Arc<Mux> {
    let mut mux = Mux::new();

    mux.add_handler(
        "command/login",
        handler_fn(|_session, _request| async move { respond(ResultCode::Ok) }),
    );
    mux.add_handler(
        "command/logout",
        handler_fn(|_session, _request| async move { respond(ResultCode::OkBye) }),
    );
    mux.add_handler(
        "command/check/domain",
        handler_fn(|_session, _request| async move { respond(ResultCode::Ok) }),
    );
    mux.add_handler(
        "command/info/domain",
        handler_fn(|_session, _request| async move { respond(ResultCode::ObjectDoesNotExist) }),
    );

    Arc::new(mux)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;

    let client_auth = if settings.tls.require_client_certificate {
        ClientAuth::RequireAny
    } else {
        ClientAuth::None
    };
    let tls = TlsConfig::from_pem_files(
        &settings.tls.certificate,
        &settings.tls.private_key,
        client_auth,
    )?;

    let started_at = Instant::now();
    let server = Arc::new(Server::new(ServerConfig {
        listen_addr: settings.server.listen_addr.clone(),
        tls,
        session: SessionConfig {
            idle_timeout: settings.session.idle_timeout,
            session_timeout: settings.session.session_timeout,
            greeting: Arc::new(|_session: &SessionInfo| {
                let greeting = Greeting::new(
                    SERVER_ID,
                    vec![
                        NS_DOMAIN.to_string(),
                        NS_HOST.to_string(),
                        NS_CONTACT.to_string(),
                    ],
                );
                let document = encode(
                    &greeting,
                    &server_xml_attributes(),
                    &NamespaceAliases::default(),
                )?;
                Ok(Bytes::from(document))
            }),
            handler: build_mux().into_handler(),
            validator: Some(Arc::new(WellFormed)),
            observers: vec![Arc::new(|session: &SessionInfo| {
                info!(session_id = %session.id(), "command received");
            })],
        },
        on_started: vec![Arc::new(move || {
            info!(startup = ?started_at.elapsed(), "server ready");
        })],
    })?);

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    server.listen_and_serve().await?;
    Ok(())
}
