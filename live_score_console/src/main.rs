// Legend for various fix-this comments:
//   * "TODO" - bug or missing crucial feature.
//   * "Improvement potential" - missing nice-to-have feature or an opportunity
//       to make code better or faster.

#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

mod client_config;
mod client_main;
mod fallback;
mod network;
mod tui;

use std::path::PathBuf;

use clap::{Command, arg};


fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter_level(log::LevelFilter::Info)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("tungstenite", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let matches = Command::new("Live score")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about("Follows a live cricket match from the terminal")
        .subcommand_required(true)
        .subcommand(
            Command::new("watch")
                .about("Show live score updates and relay score-update forms")
                .arg(arg!(<page_url> "Match page URL, e.g. http://localhost:8000/match/42/"))
                .arg(
                    arg!(--"match-id" <id> "Match ID; overrides the one in the page URL")
                        .required(false),
                )
                .arg(
                    arg!(--"config" <config_file> "Path to the configuration file: yaml-serialized ClientSettings.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("check-page")
                .about("Print the match id, socket URL and fallback URL for a page")
                .arg(arg!(<page_url> "Match page URL"))
                .arg(
                    arg!(--"match-id" <id> "Match ID; overrides the one in the page URL")
                        .required(false),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("watch", sub_matches)) => {
            let settings = match sub_matches.get_one::<PathBuf>("config") {
                Some(path) => client_config::read_config_file(path)?,
                None => client_config::ClientSettings::default(),
            };
            client_main::run(client_main::ClientConfig {
                page_url: sub_matches.get_one::<String>("page_url").unwrap().clone(),
                match_id: sub_matches.get_one::<String>("match-id").cloned(),
                settings,
            })
        }
        Some(("check-page", sub_matches)) => client_main::check_page(
            sub_matches.get_one::<String>("page_url").unwrap(),
            sub_matches.get_one::<String>("match-id").cloned(),
        ),
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }
}
