use std::process::ExitCode;

use http_request_core::HttpRequestClient;
use http_request_plugin::{command, env, logger, reporter_for, OUTPUT_VAR};
use log::error;

const USAGE: &str = "usage: http-request-plugin [--print-command | --print-docker <image>]";

fn main() -> ExitCode {
    // Only fails when a logger is already installed.
    let _ = logger::init_from_env();

    let params = match env::from_env() {
        Ok(params) => params,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => {}
        ["--print-command"] => {
            println!("{}", command::shell_command(&params));
            return ExitCode::SUCCESS;
        }
        ["--print-docker", image] => {
            println!("{}", command::docker_command(&params, image));
            return ExitCode::SUCCESS;
        }
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    }

    let mut reporter = reporter_for(&params, std::env::var(OUTPUT_VAR).ok());
    let client = HttpRequestClient::new(params);
    match client.run(&mut reporter) {
        Ok(record) => {
            client.log().info(format!("request finished with status {}", record.status));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
