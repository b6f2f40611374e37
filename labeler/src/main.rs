use std::process::ExitCode;

use clap::{arg, command, crate_name, value_parser, Command};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(
            Command::new(cli::SERVER_SUBCOMMAND)
                .about(cli::SERVER_DESCRIPTION)
                .arg(
                    arg!(-p --port <PORT>)
                        .required(false)
                        .value_parser(value_parser!(u16))
                        .help("Port to listen on. Overrides LABELER_PORT"),
                ),
        )
        .subcommand(
            Command::new(cli::CLASSIFY_SUBCOMMAND)
                .about(cli::CLASSIFY_DESCRIPTION)
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .help("Path to png, jpg, jpeg or gif image to label"),
                )
                .arg(arg!(--json "Print the analysis as JSON instead of a table")),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if cli.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
        ExitCode::SUCCESS
    } else if cli.subcommand_matches(cli::BUGREPORT_SUBCOMMAND).is_some() {
        cli::bugreport::run();
        ExitCode::SUCCESS
    } else if let Some(server_matches) = cli.subcommand_matches(cli::SERVER_SUBCOMMAND) {
        let port = server_matches.get_one::<u16>("port").copied();
        cli::server::run(port).await
    } else if let Some(classify_matches) = cli.subcommand_matches(cli::CLASSIFY_SUBCOMMAND) {
        match classify_matches.get_one::<String>("file") {
            Some(file) => cli::classify::run(file, classify_matches.get_flag("json")).await,
            None => ExitCode::FAILURE,
        }
    } else {
        ExitCode::FAILURE
    }
}
