use std::net::IpAddr;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::task::LocalSet;
use tracing::error;
use tracing_subscriber::EnvFilter;

use mpd_bridge::config::{Config, DEFAULT_PORT};
use mpd_bridge::{server, MemoryPlayer, Track};

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Serves a music player over the MPD protocol.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Password clients have to send before they get any permission
    #[arg(long, env = "MPD_BRIDGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// The log level comes from, in order of precedence: the command line,
/// `RUST_LOG`, then "info".
fn init_logger(args: &Args) {
    let filter = if args.quiet || args.verbose > 0 {
        let level = match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("mpd_bridge={}", level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn demo_tracks() -> Vec<Track> {
    vec![
        Track::new("/music/Aphex Twin/Selected Ambient Works 85-92/01 Xtal.flac")
            .with_tag("artist", "Aphex Twin")
            .with_tag("album", "Selected Ambient Works 85-92")
            .with_tag("title", "Xtal")
            .with_tag("tracknumber", "1")
            .with_tag("date", "1992-11-09")
            .with_length(Duration::from_secs(291))
            .with_format(44100, 16, 2)
            .with_bitrate(1011),
        Track::new("/music/Boards of Canada/Music Has the Right to Children/02 An Eagle in Your Mind.flac")
            .with_tag("artist", "Boards of Canada")
            .with_tag("album", "Music Has the Right to Children")
            .with_tag("title", "An Eagle in Your Mind")
            .with_tag("tracknumber", "2")
            .with_tag("date", "1998")
            .with_length(Duration::from_secs(383))
            .with_format(44100, 16, 2)
            .with_bitrate(987),
    ]
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logger(&args);

    let config = Config {
        bind: args.bind,
        port: args.port,
        password: args.password,
    };
    let player = Rc::new(MemoryPlayer::new(demo_tracks()));

    let local = LocalSet::new();
    let res = local
        .run_until(server::run(&config, player, signal::ctrl_c()))
        .await;

    if let Err(err) = res {
        error!("{}", err);
        process::exit(1);
    }
}
