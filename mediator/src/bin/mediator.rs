use config::MediatorConfig;
use logger::Logger;
use mediator::Mediator;
use std::env;
use std::process::exit;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: mediator <config-file>");
        exit(1);
    }

    let config = match MediatorConfig::from_file(&args[1]) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            exit(1);
        }
    };

    let logger = Logger::new("mediator.log");
    let mediator = Mediator::start(config, logger.clone());

    logger.info(&format!("mediator {} starting", mediator.id()), "main");

    if let Err(e) = mediator.serve() {
        eprintln!("fatal error: {e}");
        exit(1);
    }
}
