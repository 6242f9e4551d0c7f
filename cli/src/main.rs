//! Operator-facing control CLI: talks to a Scribe's or Mediator's
//! `cli_port` to print versions, per-node request counts, and (on a
//! Mediator) the current partition table.

use protocol::message::{Frame, GetVersionRequest};
use std::env;
use std::net::{SocketAddr, TcpStream};
use std::process::exit;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: cluster-cli <ip:port> <version|stats|responsibility> [--all]");
        exit(1);
    }

    let addr: SocketAddr = match args[1].parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("invalid address. expected format: ip:port");
            exit(1);
        }
    };

    let mut stream = match TcpStream::connect(addr) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error connecting to {addr}: {e}");
            exit(1);
        }
    };

    let all = args.get(3).map(|a| a == "--all").unwrap_or(false);

    let request = match args[2].as_str() {
        "version" => Frame::GetVersionRequest(GetVersionRequest { all }),
        "stats" => Frame::GetStatsRequest,
        "responsibility" => Frame::GetResponsibilityRequest,
        other => {
            eprintln!("unknown command '{other}'");
            exit(1);
        }
    };

    if let Err(e) = request.write_to(&mut stream) {
        eprintln!("error sending request: {e}");
        exit(1);
    }

    match Frame::read_from(&mut stream) {
        Ok(Frame::GetVersionResponse(table))
        | Ok(Frame::GetStatsResponse(table))
        | Ok(Frame::GetResponsibilityResponse(table)) => print_table(&table),
        Ok(Frame::ErrorResponse(err)) => {
            eprintln!("server error: {}", err.message);
            exit(1);
        }
        Ok(other) => {
            eprintln!("unexpected response: {other:?}");
            exit(1);
        }
        Err(e) => {
            eprintln!("error reading response: {e}");
            exit(1);
        }
    }
}

fn print_table(table: &protocol::message::TableResponse) {
    for row in &table.rows {
        println!("{}", row.join("\t"));
    }
}
