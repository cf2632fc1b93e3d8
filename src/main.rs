//! `chatserver`: parses the CLI and the channel-table config file, then binds the configured
//! ports and runs until `/shutdown` (read from standard input by [`chatserver::admin`]) or SIGINT
//! terminates the process. There is no graceful shutdown: both paths exit the process
//! immediately.

use chatserver::state::State;
use chatserver::{admin, config, lines, listener};
use std::time::Duration;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match config::parse_args(args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(4);
        }
    };

    let table = match config::ChannelTable::load(&cli.config_path) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(5);
        }
    };

    let state = State::new(table.clone());
    let afk_time = Duration::from_secs(cli.afk_time);

    tokio::spawn(admin::run(state.clone()));

    tokio::select! {
        () = listener::run(table, state, afk_time) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("{}", lines::shuts_down());
            std::process::exit(0);
        }
    }
}
