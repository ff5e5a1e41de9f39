mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;

use session::{EmulatorOptions, Session, parse_policy};

const USAGE: &str = "Usage: mystery-box-emulator [--store <path>] [--transcript <path>] \
                     [--attempts <n>] [--policy <single|retry>] [--timeout <seconds>]";

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let styled = stdout.is_tty();
    let mut writer = stdout.lock();
    let mut session = Session::new(&options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Mystery Box Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            if styled {
                write_styled(&mut writer, &response)?;
            } else {
                writeln!(writer, "{response}")?;
            }
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn write_styled(writer: &mut impl Write, line: &str) -> io::Result<()> {
    if line.starts_with("ERR") {
        writeln!(writer, "{}", line.red())
    } else if line.starts_with("session ") {
        writeln!(writer, "{}", line.bold())
    } else if line.contains("display") {
        writeln!(writer, "{}", line.yellow())
    } else if line.contains("latch: open") {
        writeln!(writer, "{}", line.green().bold())
    } else if line.contains("power: ") {
        writeln!(writer, "{}", line.dark_grey())
    } else {
        writeln!(writer, "{line}")
    }
}

fn parse_options(args: impl Iterator<Item = String>) -> Result<EmulatorOptions, String> {
    let mut options = EmulatorOptions::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--store" => options.store_path = Some(PathBuf::from(value()?)),
            "--transcript" => options.transcript_path = Some(PathBuf::from(value()?)),
            "--attempts" => {
                let raw = value()?;
                let attempts = raw
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid attempt count `{raw}`"))?;
                options.max_attempts = Some(attempts);
            }
            "--policy" => options.retry_policy = Some(parse_policy(&value()?)?),
            "--timeout" => {
                let raw = value()?;
                let seconds = raw
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid timeout `{raw}`"))?;
                options.session_timeout = Some(Duration::from_secs(seconds));
            }
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }
    Ok(options)
}
