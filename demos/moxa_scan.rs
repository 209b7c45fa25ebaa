//! Scan the configured Moxa gateway ports and probe the first one with a
//! bare CR LF, printing whatever the attached instrument answers.
//!
//! Usage: `moxa_scan [config.json]`

use std::env;

use hv_psu_control::moxa::{self, MoxaConfig};

fn main() {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "moxa.json".to_owned());
    let config = match MoxaConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Cannot load {path}: {e}");
            eprintln!("Set moxa.host to the IP address of the gateway.");
            std::process::exit(1);
        }
    };

    println!("Scanning {} ...", config.host);
    for probe in moxa::scan(&config) {
        println!(
            "{} {} {}",
            probe.port,
            if probe.ok { "OK" } else { "FAIL" },
            probe.detail
        );
    }

    let Some(&port) = config.ports.first() else {
        return;
    };
    match moxa::exchange(&config, port, b"\r\n", 256) {
        Ok(response) => {
            println!("Recv: {:?}", String::from_utf8_lossy(&response));
            let hex: String = response.iter().map(|b| format!("{b:02x}")).collect();
            println!("Recv hex: {hex}");
        }
        Err(e) => println!("Probe of port {port} failed: {e}"),
    }
}
