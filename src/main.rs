use chipkit_bench::{
    BenchmarkRunner, Context, ResultSet, SerialTransport, Summary, Transport, TransportSettings,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Benchmark USB and FTDI transfer rates on the chipKIT",
    long_about = None
)]
struct Args {
    /// Run the USB benchmark (the default, overridden by --ftdi)
    #[arg(long)]
    usb: bool,

    /// Run the FTDI serial benchmark
    #[arg(long)]
    ftdi: bool,

    /// Serial device of the FTDI link
    #[arg(long, default_value = "/dev/ttyUSB0")]
    tty: PathBuf,

    /// USB vendor ID to search for, decimal or hex with a 0x prefix
    #[arg(long, default_value = "0x04d8", value_parser = parse_vendor_id)]
    vendor: u16,

    /// Bytes to read per message size instead of the transport's default
    #[arg(long)]
    max_bytes: Option<usize>,
}

impl Args {
    /// `--usb` is on by default, so `--ftdi` alone decides the transport.
    fn serial_selected(&self) -> bool {
        self.ftdi
    }
}

fn parse_vendor_id(value: &str) -> Result<u16, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|err| format!("invalid vendor ID `{}`: {}", value, err))
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn settings(defaults: TransportSettings, args: &Args) -> TransportSettings {
    match args.max_bytes {
        Some(max_bytes) => defaults.with_max_bytes(max_bytes),
        None => defaults,
    }
}

fn open(args: &Args) -> chipkit_bench::Result<Box<dyn Transport>> {
    if args.serial_selected() {
        if args.usb {
            info!("--ftdi overrides --usb");
        }
        let transport = SerialTransport::open(&args.tty, settings(TransportSettings::SERIAL, args))?;
        info!("Benchmarking FTDI link on {}", args.tty.display());
        Ok(Box::new(transport))
    } else {
        let context = Context::new()?;
        let transport = context.open_usb(args.vendor, settings(TransportSettings::USB, args))?;
        info!("Benchmarking USB device from vendor {:#06x}", args.vendor);
        Ok(Box::new(transport))
    }
}

fn run(args: &Args) -> chipkit_bench::Result<ResultSet> {
    let transport = open(args)?;
    BenchmarkRunner::new(transport).sweep()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(&args) {
        Ok(results) => {
            println!();
            print!("{}", Summary(&results));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
