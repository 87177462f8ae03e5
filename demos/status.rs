use std::env;

use inquire::Select;
use riden_rd_psu::{config::ConnectionConfig, psu::RdPsu, serial};

// The model to look for when no port is given.
const EXPECTED_MODEL: u32 = 6006;

fn main() {
    env_logger::init();

    let config = ConnectionConfig::default();

    let mut psu = match env::args().nth(1) {
        Some(port_name) => open(&config, &port_name),
        None => match serial::discover(&config, EXPECTED_MODEL) {
            Ok(psu) => psu,
            Err(e) => {
                eprintln!("{}, pick a port instead.", e);
                let port_name = select_port();
                open(&config, &port_name)
            }
        },
    };

    println!("Connected to {}", psu);

    let report = psu.status_report().expect("Failed to read status");
    println!("{}", report);

    println!("== Charge overview");
    let overview = psu.charge_overview().expect("Failed to read charge overview");
    for (name, reading) in overview.entries() {
        println!("{:<18}: {}", name, reading);
    }
}

fn open(
    config: &ConnectionConfig,
    port_name: &str,
) -> RdPsu<riden_rd_psu::rtu::RtuTransport<serial::SerialInterface>> {
    println!("Using port: {}", port_name);
    let transport = config.open(port_name).expect("Failed to open serial port");
    RdPsu::new(transport).expect("Failed to identify PSU")
}

fn select_port() -> String {
    let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

    Select::new("Select a serial port:", port_names)
        .prompt()
        .expect("Failed to select port")
}
