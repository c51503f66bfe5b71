//! Config push example
//!
//! Connects to an SR Linux device, shows the software version, pushes a
//! file of `set` statements through a candidate transaction and reports
//! drift against the running configuration afterwards.
//!
//! # Usage
//!
//! ```bash
//! # Preview the change without committing
//! cargo run --example config_push -- --host 172.20.20.2 --password NokiaSrl1! --config leaf1.cfg --check
//!
//! # Commit it
//! cargo run --example config_push -- --host 172.20.20.2 --password NokiaSrl1! --config leaf1.cfg
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use srlsh::{SessionBuilder, parse_intended, validate_syntax};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let statements = match &args.config {
        Some(path) => parse_intended(&std::fs::read_to_string(path)?),
        None => vec![
            "set / interface ethernet-1/1 admin-state enable".to_string(),
            "set / interface ethernet-1/1 description \"managed by srlsh\"".to_string(),
        ],
    };

    let syntax = validate_syntax(&statements);
    if !syntax.is_empty() {
        for issue in &syntax {
            eprintln!(
                "line {}: {} ({})",
                issue.line.unwrap_or_default(),
                issue.message,
                issue.command.as_deref().unwrap_or("")
            );
        }
        std::process::exit(1);
    }

    println!("=== srlsh Config Push Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .command_timeout(Duration::from_secs(args.timeout))
        .danger_disable_host_key_verification();

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.build()?;
    session.connect().await?;
    println!("Connected!\n");

    let version = session.execute_command("show version").await?;
    println!("{}\n", version.result);

    if args.check {
        let diff = session.check_config_diff(&statements).await?;
        if diff.is_empty() {
            println!("No changes.");
        } else {
            println!("Would change:\n{}", diff);
        }
    } else {
        let result = session.send_config(&statements, true).await?;
        println!(
            "changed: {}, committed: {}, {} statements",
            result.changed,
            result.committed,
            result.commands.len()
        );
        if !result.diff.is_empty() {
            println!("{}", result.diff);
        }
    }

    let drift = session.compare_running(&statements, None).await?;
    if drift.has_drift {
        println!("\nDrift against running configuration:\n{}", drift.diff);
    } else {
        println!("\nRunning configuration matches.");
    }

    println!("\nClosing connection...");
    session.disconnect().await?;
    println!("Done!");

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    config: Option<PathBuf>,
    check: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = "admin".to_string();
        let mut password = None;
        let mut key = None;
        let mut timeout = 30u64;
        let mut config = None;
        let mut check = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                }
                "--check" => check = true,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            timeout,
            config,
            check,
        }
    }
}

fn print_help() {
    println!("Usage: config_push [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -h, --host <HOST>         Target host (default: localhost)");
    println!("  -p, --port <PORT>         SSH port (default: 22)");
    println!("  -u, --user <USER>         Username (default: admin)");
    println!("  -P, --password <PASS>     Password");
    println!("  -k, --key <PATH>          Private key file");
    println!("  -t, --timeout <SECS>      Connect and command timeout (default: 30)");
    println!("  -c, --config <PATH>       File of set statements to push");
    println!("      --check               Show the diff and discard instead of committing");
    println!("      --help                Show this help");
}
