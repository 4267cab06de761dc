//! SiltKV CLI Client
//!
//! Command-line interface for interacting with a SiltKV server.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use siltkv::network::Client;

/// SiltKV CLI
#[derive(Parser, Debug)]
#[command(name = "siltkv-cli")]
#[command(about = "CLI for the SiltKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, env = "SILTKV_SERVER", default_value = "127.0.0.1:7878")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: cannot connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match &args.command {
        Commands::Get { key } => client.get(key.as_bytes()).map(|found| match found {
            Some(value) => {
                print_value(&value);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("(not found)");
                ExitCode::from(2)
            }
        }),
        Commands::Set { key, value } => client.put(key.as_bytes(), value.as_bytes()).map(|echoed| {
            print_value(&echoed);
            ExitCode::SUCCESS
        }),
        Commands::Del { key } => client.delete(key.as_bytes()).map(|existed| {
            if existed {
                println!("OK");
                ExitCode::SUCCESS
            } else {
                eprintln!("(not found)");
                ExitCode::from(2)
            }
        }),
        Commands::Ping => client.ping().map(|()| {
            println!("PONG");
            ExitCode::SUCCESS
        }),
    };

    result.unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    })
}

fn print_value(value: &[u8]) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(value);
    let _ = stdout.write_all(b"\n");
}
