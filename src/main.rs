use clap::{Parser, Subcommand};
use serial_mux::config::ConfigLoader;
use serial_mux::{logging, DeviceFlags, DeviceTable, SerialDevice, SerialPortTransport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Serial character-device layer with a single receive multiplexer.",
    long_about = "Registers serial ports as named devices, opens them, and lets one background thread poll every port for incoming data."
)]
struct Args {
    /// Configuration file (defaults to the standard search path).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports known to the operating system.
    Ports,
    /// Open ports and log everything they receive.
    Monitor {
        /// Port names or configured aliases.
        #[arg(required = true)]
        ports: Vec<String>,

        /// Baud rate for every port (defaults to `[serial.line]`).
        #[arg(short, long)]
        baud: Option<u32>,

        /// Stop after this many seconds; 0 runs until killed.
        #[arg(short, long, default_value_t = 0)]
        duration_secs: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    logging::init(&config.logging)?;

    match args.command {
        Command::Ports => list_ports(),
        Command::Monitor {
            ports,
            baud,
            duration_secs,
        } => {
            if let Some(baud) = baud {
                config.serial.line.baud_rate = baud;
            }
            config.validate()?;
            monitor(&config, &ports, duration_secs)
        }
    }
}

fn list_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => println!(
                "{}\tusb {:04x}:{:04x} {}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            serialport::SerialPortType::BluetoothPort => {
                println!("{}\tbluetooth", port.port_name)
            }
            serialport::SerialPortType::PciPort => println!("{}\tpci", port.port_name),
            serialport::SerialPortType::Unknown => println!("{}", port.port_name),
        }
    }
    Ok(())
}

fn monitor(
    config: &serial_mux::Config,
    ports: &[String],
    duration_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = DeviceTable::from_config(config);

    for name in ports {
        let path = config.serial.resolve_port(name);
        let transport = SerialPortTransport::open(&path, &config.serial.line)?;
        let device = table.register_device(name, DeviceFlags::RDWR, Arc::new(transport))?;
        device.open(DeviceFlags::RDWR)?;
        device.set_rx_indicate(log_received);
        info!(device = %name, port = %path, "monitoring");
    }

    if duration_secs == 0 {
        loop {
            std::thread::park();
        }
    }
    std::thread::sleep(Duration::from_secs(duration_secs));

    for name in table.names() {
        if let Some(device) = table.find(&name) {
            if let Err(e) = device.close() {
                warn!(device = %name, error = %e, "close failed");
            }
            let stats = device.stats();
            println!(
                "{name}: rx {} bytes, tx {} bytes, {} notifications",
                stats.rx_bytes, stats.tx_bytes, stats.rx_notifications
            );
        }
    }
    table.shutdown();

    let stats = table.mux_stats();
    println!(
        "mux: {} passes, {} queries ({} failed), {} notifications",
        stats.cycles, stats.queries, stats.query_errors, stats.notifications
    );
    Ok(())
}

/// Receive callback: drain what is waiting and log it.
fn log_received(device: &SerialDevice, waiting: usize) {
    let mut buffer = vec![0u8; waiting.min(device.config().bufsz)];
    match device.read(&mut buffer) {
        Ok(0) => {}
        Ok(n) => info!(
            device = device.name(),
            bytes = n,
            data = %String::from_utf8_lossy(&buffer[..n]),
            "received"
        ),
        Err(e) => debug!(device = device.name(), error = %e, "read failed"),
    }
}
