use std::{
    io::{self, Write as _},
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
};

use clap::Parser as _;
use color_eyre::eyre::Context as _;
use futures::StreamExt as _;
use namecoin_dissector::{stream::info_column, Config, Conversation, Event, Feed};
use tokio::io::AsyncReadExt as _;
use tracing::{debug, info, warn};

#[derive(Debug, clap::Parser)]
struct Cli {
    #[clap(flatten)]
    options: Options,
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Args)]
struct Options {
    /// Report messages which span segments as malformed, instead of waiting for the rest.
    #[clap(long)]
    no_desegment: bool,
    /// Reject messages advertising a larger payload than this.
    #[clap(long)]
    max_frame_length: Option<u32>,
    /// Only print a summary line per segment.
    #[clap(long)]
    no_tree: bool,
}

impl From<&Options> for Config {
    fn from(options: &Options) -> Self {
        Config {
            desegment: !options.no_desegment,
            max_frame_length: options.max_frame_length,
            build_tree: !options.no_tree,
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Dissect one direction of a captured stream.
    File {
        /// Read from stdin if omitted.
        path: Option<PathBuf>,
        /// Deliver the input in segments of this many bytes.
        #[clap(long)]
        chunk_size: Option<NonZeroUsize>,
    },
    /// Accept connections, and dissect what each peer sends.
    Listen { address: SocketAddr },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(?cli);
    let config = Config::from(&cli.options);

    match cli.subcommand {
        Subcommand::File { path, chunk_size } => {
            let bytes = match &path {
                Some(path) => tokio::fs::read(path)
                    .await
                    .wrap_err_with(|| format!("couldn't read {}", path.display()))?,
                None => {
                    let mut bytes = vec![];
                    tokio::io::stdin()
                        .read_to_end(&mut bytes)
                        .await
                        .wrap_err("couldn't read stdin")?;
                    bytes
                }
            };
            let chunk_size = chunk_size.map_or(bytes.len().max(1), NonZeroUsize::get);
            info!(len = bytes.len(), chunk_size, "dissecting");

            let mut conversation = Conversation::new(config);
            for (ix, segment) in bytes.chunks(chunk_size).enumerate() {
                match conversation.feed(segment) {
                    Feed::Declined => {
                        warn!("stream doesn't start with a known magic");
                        return Ok(());
                    }
                    Feed::Accepted(events) => {
                        report(&format!("#{ix}"), &events).wrap_err("couldn't write report")?
                    }
                }
            }
            if let Some(event) = conversation.finish() {
                report("eof", &[event]).wrap_err("couldn't write report")?;
            }
            Ok(())
        }
        Subcommand::Listen { address } => {
            let listener = tokio::net::TcpListener::bind(address)
                .await
                .wrap_err("couldn't bind listener")?;
            info!(%address, "listening");
            loop {
                let (socket, peer) = listener
                    .accept()
                    .await
                    .wrap_err("couldn't accept connection")?;
                info!(%peer, "accepted connection");
                tokio::spawn(async move {
                    match dissect_connection(socket, peer, config).await {
                        Ok(()) => info!(%peer, "connection closed"),
                        Err(error) => warn!(%peer, ?error, "connection failed"),
                    }
                });
            }
        }
    }
}

/// Each read from the socket is one segment.
async fn dissect_connection(
    socket: tokio::net::TcpStream,
    peer: SocketAddr,
    config: Config,
) -> color_eyre::Result<()> {
    let mut segments = tokio_util::codec::FramedRead::new(socket, tokio_util::codec::BytesCodec::new());
    let mut conversation = Conversation::new(config);
    while let Some(segment) = segments.next().await {
        let segment = segment.wrap_err("couldn't read from peer")?;
        match conversation.feed(&segment) {
            // try again with the next segment
            Feed::Declined => debug!(%peer, len = segment.len(), "ignoring segment"),
            Feed::Accepted(events) => {
                report(&peer.to_string(), &events).wrap_err("couldn't write report")?
            }
        }
    }
    if let Some(event) = conversation.finish() {
        report(&peer.to_string(), &[event]).wrap_err("couldn't write report")?;
    }
    Ok(())
}

fn report(source: &str, events: &[Event]) -> io::Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{source}: {}", info_column(events))?;
    for event in events {
        match event {
            Event::Message(dissection) => {
                write!(stdout, "{}", dissection.tree)?;
                for annotation in &dissection.annotations {
                    writeln!(stdout, "    {annotation}")?;
                }
            }
            Event::Malformed {
                stream_offset,
                dropped,
                error,
            } => writeln!(
                stdout,
                "    malformed at stream offset {stream_offset}, dropped {dropped} bytes: {error}"
            )?,
        }
    }
    Ok(())
}
