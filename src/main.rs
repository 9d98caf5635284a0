use std::io::{self, Write};
use std::process::ExitCode;

use cpu_probe::{CpuProbe, report};
use log::error;

fn run() -> io::Result<()> {
    let probe = CpuProbe::new();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    writeln!(out, "CPU Feature Detector started")?;
    if probe.processor_info().architecture.is_arm() {
        writeln!(out, "Running on ARM architecture")?;
    } else if probe.processor_info().architecture.is_x86() {
        writeln!(out, "Running on x86/x64 architecture")?;
    } else {
        writeln!(out, "Running on {} architecture", std::env::consts::ARCH)?;
    }
    writeln!(out)?;

    report::write_report(&mut out, &probe)?;
    out.flush()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("failed to render report: {err}");
            eprintln!("Failed to render report: {err}");
            ExitCode::from(1)
        }
    }
}
