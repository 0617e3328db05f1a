use std::process;
use tickblend::cli::CliOverrides;
use tickblend::trace::run_trace;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = match CliOverrides::parse_from_env().and_then(CliOverrides::into_trace_options) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("[cli] {err:?}");
            process::exit(2);
        }
    };
    match run_trace(&options) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => eprintln!("{json}"),
            Err(err) => eprintln!("summary error: {err}"),
        },
        Err(err) => {
            eprintln!("tickblend error: {err:?}");
            process::exit(1);
        }
    }
}
