use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{EmulatorOptions, Session};

/// Command scripts replayed against a fresh box; one transcript each.
const SCENARIOS: &[(&str, &[&str])] = &[
    (
        "too-early",
        &["fix 2022-06-03 18:00 52.09 5.12", "power", "log"],
    ),
    (
        "opened",
        &["fix 2022-06-04 23:10", "near 4", "power", "budget"],
    ),
    (
        "out-of-range",
        &[
            "fix 2022-06-04 23:10",
            "near 500",
            "power",
            "near 350",
            "power",
            "budget",
        ],
    ),
    (
        "exhausted",
        &[
            "budget set 0",
            "fix 2022-06-04 23:30",
            "near 900",
            "power",
            "reset hold",
            "power",
            "budget",
        ],
    ),
    (
        "cold-start",
        &["acquire 4", "fix 2022-06-05 07:00", "near 12", "power", "log"],
    ),
    (
        "nmea",
        &[
            "nmea $GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
            "bench on",
            "power",
        ],
    ),
];

fn main() -> io::Result<()> {
    for (name, commands) in SCENARIOS {
        record_scenario(name, commands)?;
    }
    Ok(())
}

fn record_scenario(name: &str, commands: &[&str]) -> io::Result<()> {
    let options = EmulatorOptions {
        transcript_path: Some(PathBuf::from(format!("transcripts/{name}.log"))),
        ..EmulatorOptions::default()
    };
    let mut session = Session::new(&options)?;
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
