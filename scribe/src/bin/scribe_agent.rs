use config::ScribeConfig;
use logger::Logger;
use scribe::ScribeAgent;
use std::env;
use std::process::exit;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: scribe-agent <config-file>");
        exit(1);
    }

    let config = match ScribeConfig::from_file(&args[1]) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            exit(1);
        }
    };

    let logger = Logger::new("scribe.log");

    let agent = match ScribeAgent::start(config, logger.clone()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("startup error: {e}");
            exit(1);
        }
    };

    logger.info(&format!("scribe agent {} starting", agent.id()), "main");

    if let Err(e) = agent.serve() {
        eprintln!("fatal error: {e}");
        exit(1);
    }
}
