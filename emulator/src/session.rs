use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use mystery_core::budget::{AttemptBudget, KeyValueStore};
use mystery_core::config::{BoxConfig, DEFAULT_CONFIG, RetryPolicy};
use mystery_core::fix::PositionFix;
use mystery_core::nmea::FixTracker;
use mystery_core::session::{
    BoxIo, Clock, FixProvider, Latch, LatchPosition, PowerSwitch, SessionDriver, SessionEnd,
    SessionReport, StatusLed, TextPresenter,
};
use mystery_core::telemetry::SessionEvent;
use mystery_core::tunes::Buzzer;

/// Meters per degree of latitude on the haversine sphere.
const METERS_PER_DEGREE: f64 = 111_194.93;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "fix",
        "fix <yyyy-mm-dd> <hh[:mm[:ss]]> [lat lon]  - script the next receiver fix",
    ),
    (
        "near",
        "near <meters>                  - place the fix due north of the target",
    ),
    (
        "nofix",
        "nofix                          - receiver reports nothing valid",
    ),
    (
        "nmea",
        "nmea <sentence>                - feed a raw NMEA sentence to the decoder",
    ),
    (
        "acquire",
        "acquire <seconds>              - delay before the receiver reports the fix",
    ),
    (
        "reset",
        "reset <hold|release>           - reset button level at the next power-on",
    ),
    (
        "power",
        "power                          - power the box on and run one session",
    ),
    (
        "budget",
        "budget [set <n>]               - show or overwrite the stored attempts",
    ),
    (
        "log",
        "log                            - list telemetry of the last session",
    ),
    (
        "bench",
        "bench <on|off>                 - keep the board powered after cutoff",
    ),
    (
        "status",
        "status                         - show provisioning and emulator state",
    ),
    (
        "help",
        "help [topic]                   - show help for a command",
    ),
];

/// Command-line overrides for the emulated box.
#[derive(Clone, Debug, Default)]
pub struct EmulatorOptions {
    pub store_path: Option<PathBuf>,
    pub transcript_path: Option<PathBuf>,
    pub max_attempts: Option<u16>,
    pub retry_policy: Option<RetryPolicy>,
    pub session_timeout: Option<Duration>,
}

impl EmulatorOptions {
    pub fn config(&self) -> BoxConfig {
        let mut config = DEFAULT_CONFIG;
        if let Some(max_attempts) = self.max_attempts {
            config = config.with_max_attempts(max_attempts);
        }
        if let Some(policy) = self.retry_policy {
            config = config.with_retry_policy(policy);
        }
        if let Some(timeout) = self.session_timeout {
            config = config.with_session_timeout(timeout);
        }
        config
    }
}

pub fn parse_policy(tag: &str) -> Result<RetryPolicy, String> {
    if tag.eq_ignore_ascii_case("single") {
        Ok(RetryPolicy::SingleCheck)
    } else if tag.eq_ignore_ascii_case("retry") {
        Ok(RetryPolicy::UntilTimeout)
    } else {
        Err(format!("Unknown retry policy `{tag}` (expected single|retry)"))
    }
}

pub struct Session {
    config: BoxConfig,
    receiver: ScriptedReceiver,
    store: HostStore,
    reset_held: bool,
    bench_supply: bool,
    last_events: Vec<SessionEvent>,
    power_ons: usize,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(options: &EmulatorOptions) -> io::Result<Self> {
        let store = match &options.store_path {
            Some(path) => HostStore::open(path)?,
            None => HostStore::default(),
        };
        let transcript = options
            .transcript_path
            .as_deref()
            .map(TranscriptLogger::new)
            .transpose()?;

        Ok(Self {
            config: options.config(),
            receiver: ScriptedReceiver::default(),
            store,
            reset_held: false,
            bench_supply: false,
            last_events: Vec::new(),
            power_ons: 0,
            transcript,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record(TranscriptRole::Host, &[trimmed.to_string()])?;

        let (command, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(command, rest)| (command, rest.trim()));
        let lines = match command.to_ascii_lowercase().as_str() {
            "help" => help_lines(rest),
            "fix" => self.handle_fix(rest),
            "near" => self.handle_near(rest),
            "nofix" => {
                self.receiver.script(PositionFix::empty());
                vec!["OK receiver cleared".to_string()]
            }
            "nmea" => self.handle_nmea(rest),
            "acquire" => self.handle_acquire(rest),
            "reset" => self.handle_reset(rest),
            "power" | "run" => self.handle_power(),
            "budget" => self.handle_budget(rest),
            "log" => self.handle_log(),
            "bench" => self.handle_bench(rest),
            "status" => self.handle_status(),
            other => vec![format!("ERR unknown command `{other}` (try `help`)")],
        };

        self.record(TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    fn handle_fix(&mut self, args: &str) -> Vec<String> {
        match parse_fix(args) {
            Ok(fix) => {
                self.receiver.script(fix);
                vec![format!("OK fix {}", describe_fix(&fix))]
            }
            Err(err) => vec![format!("ERR fix {err}")],
        }
    }

    fn handle_near(&mut self, args: &str) -> Vec<String> {
        let Ok(meters) = args.parse::<f64>() else {
            return vec![format!("ERR near expects meters, got `{args}`")];
        };
        let target = self.config.target;
        let base = self.receiver.scripted();
        let fix = PositionFix {
            location_valid: true,
            lat: target.latitude + meters / METERS_PER_DEGREE,
            lon: target.longitude,
            ..base
        };
        self.receiver.script(fix);
        vec![format!("OK fix {}", describe_fix(&fix))]
    }

    fn handle_nmea(&mut self, sentence: &str) -> Vec<String> {
        match self.receiver.feed_nmea(sentence) {
            Ok(fix) => vec![format!("OK nmea {}", describe_fix(&fix))],
            Err(err) => vec![format!("ERR nmea {err}")],
        }
    }

    fn handle_acquire(&mut self, args: &str) -> Vec<String> {
        match args.parse::<f64>() {
            Ok(seconds) if seconds >= 0.0 && seconds.is_finite() => {
                let delay = Duration::from_secs_f64(seconds);
                self.receiver.acquire_after = delay;
                vec![format!("OK acquire after {}", format_duration_short(delay))]
            }
            _ => vec![format!("ERR acquire expects seconds, got `{args}`")],
        }
    }

    fn handle_reset(&mut self, args: &str) -> Vec<String> {
        if args.eq_ignore_ascii_case("hold") {
            self.reset_held = true;
        } else if args.eq_ignore_ascii_case("release") {
            self.reset_held = false;
        } else {
            return vec![format!("ERR reset expects hold|release, got `{args}`")];
        }
        vec![format!("OK reset button {}", held_label(self.reset_held))]
    }

    fn handle_bench(&mut self, args: &str) -> Vec<String> {
        if args.eq_ignore_ascii_case("on") {
            self.bench_supply = true;
        } else if args.eq_ignore_ascii_case("off") {
            self.bench_supply = false;
        } else {
            return vec![format!("ERR bench expects on|off, got `{args}`")];
        }
        vec![format!("OK bench supply {}", on_off(self.bench_supply))]
    }

    fn handle_budget(&mut self, args: &str) -> Vec<String> {
        let budget = AttemptBudget::new(self.config.max_attempts);
        if args.is_empty() {
            return match budget.get(&mut self.store) {
                Ok(left) => vec![format!(
                    "attempts left={left} max={}",
                    budget.max_attempts()
                )],
                Err(err) => vec![format!("ERR budget {err}")],
            };
        }

        let value = args
            .strip_prefix("set")
            .map(str::trim)
            .and_then(|value| value.parse::<u16>().ok());
        let Some(value) = value else {
            return vec![format!("ERR budget expects `set <n>`, got `{args}`")];
        };
        match budget.set(&mut self.store, value) {
            Ok(stored) => vec![format!("OK attempts left={stored}")],
            Err(err) => vec![format!("ERR budget {err}")],
        }
    }

    fn handle_log(&self) -> Vec<String> {
        if self.last_events.is_empty() {
            return vec!["no session recorded yet".to_string()];
        }
        self.last_events
            .iter()
            .map(|event| {
                format!(
                    "#{:<3} +{:>8} code={:#06x} {}",
                    event.id,
                    format_duration_short(event.at),
                    event.kind.to_raw(),
                    event.kind
                )
            })
            .collect()
    }

    fn handle_status(&self) -> Vec<String> {
        let config = &self.config;
        vec![
            format!(
                "target lat={:.6} lon={:.6} radius={}m",
                config.target.latitude, config.target.longitude, config.target.radius_m
            ),
            format!(
                "unlock {:04}-{:02}-{:02} hour={} UTC",
                config.schedule.year,
                config.schedule.month,
                config.schedule.day,
                config.schedule.hour
            ),
            format!(
                "max-attempts={} timeout={} policy={:?}",
                config.max_attempts,
                format_duration_short(config.session_timeout),
                config.retry_policy
            ),
            format!("receiver {}", describe_fix(&self.receiver.scripted())),
            format!(
                "reset={} bench={} power-ons={} store={}",
                held_label(self.reset_held),
                on_off(self.bench_supply),
                self.power_ons,
                self.store.describe()
            ),
        ]
    }

    fn handle_power(&mut self) -> Vec<String> {
        self.power_ons += 1;
        let output: Output = Rc::default();
        let clock = VirtualClock::default();
        let io = BoxIo {
            fix: self.receiver.power_on(),
            presenter: ConsolePresenter::new(output.clone(), clock.clone()),
            latch: ConsoleLatch::new(output.clone(), clock.clone()),
            power: ConsoleRelay::new(output.clone(), clock.clone()),
            buzzer: CountingBuzzer::default(),
            led: CountingLed::default(),
        };
        let store = std::mem::take(&mut self.store);

        let mut driver = SessionDriver::new(self.config, io, store, clock.clone());
        let report = driver.run(self.reset_held);
        if self.bench_supply && driver.linger().is_none() {
            emit(&output, &clock, "linger: receiver clock not valid".to_string());
        }

        self.last_events = driver.log().oldest_first().copied().collect();
        let (io, store, _) = driver.into_parts();
        self.store = store;

        let mut lines = vec![format!("power-on #{}", self.power_ons)];
        lines.extend(output.borrow_mut().drain(..));
        lines.push(format!(
            "buzzer tones={} led-blinks={}",
            io.buzzer.tones, io.led.blinks
        ));
        lines.push(describe_report(&report, clock.elapsed()));
        lines
    }

    fn record(&mut self, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        let Some(transcript) = self.transcript.as_mut() else {
            return Ok(());
        };
        let stamp = self.power_ons;
        for line in lines {
            transcript.append_line(stamp, role, line)?;
        }
        Ok(())
    }
}

fn help_lines(topic: &str) -> Vec<String> {
    if !topic.is_empty() {
        return match HELP_TOPICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        {
            Some((_, detail)) => vec![(*detail).to_string()],
            None => vec![
                format!("No help available for `{topic}`."),
                format!("Available topics: {}", help_topic_list()),
            ],
        };
    }

    let mut lines = vec!["Available commands:".to_string()];
    for (_, detail) in HELP_TOPICS {
        lines.push(format!("  {detail}"));
    }
    lines.push("Type `help <topic>` for a specific command.".to_string());
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses `<yyyy-mm-dd> <hh[:mm[:ss]]> [lat lon]`.
pub fn parse_fix(args: &str) -> Result<PositionFix, String> {
    let mut parts = args.split_whitespace();
    let date = parts.next().ok_or("expected a date")?;
    let time = parts.next().ok_or("expected a time")?;

    let mut date_fields = date.split('-');
    let year = parse_field::<u16>(date_fields.next(), "year")?;
    let month = parse_field::<u8>(date_fields.next(), "month")?;
    let day = parse_field::<u8>(date_fields.next(), "day")?;

    let mut time_fields = time.split(':');
    let hour = parse_field::<u8>(time_fields.next(), "hour")?;
    let minute = time_fields.next().map_or(Ok(0), |v| parse_field(Some(v), "minute"))?;
    let second = time_fields.next().map_or(Ok(0), |v| parse_field(Some(v), "second"))?;
    if hour > 23 || minute > 59 || second > 59 || !(1..=12).contains(&month) || day == 0 {
        return Err(format!("`{date} {time}` is not a valid UTC date and time"));
    }

    let mut fix = PositionFix {
        date_valid: true,
        time_valid: true,
        year,
        month,
        day,
        hour,
        minute,
        second,
        ..PositionFix::empty()
    };

    match (parts.next(), parts.next()) {
        (Some(lat), Some(lon)) => {
            fix.lat = parse_field(Some(lat), "latitude")?;
            fix.lon = parse_field(Some(lon), "longitude")?;
            fix.location_valid = true;
        }
        (None, None) => {}
        _ => return Err("expected both latitude and longitude".to_string()),
    }
    Ok(fix)
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, name: &str) -> Result<T, String> {
    let field = field.ok_or_else(|| format!("missing {name}"))?;
    field
        .parse()
        .map_err(|_| format!("invalid {name} `{field}`"))
}

fn describe_fix(fix: &PositionFix) -> String {
    let clock = if fix.date_valid && fix.time_valid {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}Z",
            fix.year, fix.month, fix.day, fix.hour, fix.minute, fix.second
        )
    } else {
        "no-clock".to_string()
    };
    let location = if fix.location_valid {
        format!("lat={:.6} lon={:.6}", fix.lat, fix.lon)
    } else {
        "no-location".to_string()
    };
    format!("{clock} {location}")
}

fn describe_report<E: std::fmt::Debug>(report: &SessionReport<E>, elapsed: Duration) -> String {
    let ended = match &report.ended_by {
        SessionEnd::Terminal => "terminal".to_string(),
        SessionEnd::Timeout => "timeout".to_string(),
        SessionEnd::StorageFault(err) => format!("storage-fault ({err})"),
    };
    let outcome = report.last_outcome.map_or("none", |outcome| outcome.label());
    let attempts = report
        .attempts_left
        .map_or_else(|| "unchanged".to_string(), |left| left.to_string());
    let distance = report
        .last_distance_m
        .map_or_else(String::new, |meters| format!(" distance={meters:.1}m"));
    format!(
        "session ended={ended} outcome={outcome} evaluations={} attempts={attempts}{distance} elapsed={}",
        report.evaluations,
        format_duration_short(elapsed)
    )
}

fn held_label(held: bool) -> &'static str {
    if held { "held" } else { "released" }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

pub fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

type Output = Rc<RefCell<Vec<String>>>;

fn emit(output: &Output, clock: &VirtualClock, line: String) {
    let stamp = format_duration_short(clock.elapsed());
    output.borrow_mut().push(format!("[+{stamp:>8}] {line}"));
}

/// Virtual session time; every delay returns immediately.
#[derive(Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<Duration>>,
}

impl VirtualClock {
    pub fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for VirtualClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.now.get()
    }

    fn elapsed_since(&self, earlier: Duration) -> Duration {
        self.now.get().saturating_sub(earlier)
    }

    fn delay(&mut self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// Receiver model: reports nothing until `acquire_after` of drain time has
/// passed in the current power-on, then the scripted fix.
#[derive(Clone, Default)]
struct ScriptedReceiver {
    tracker: FixTracker,
    scripted: PositionFix,
    acquire_after: Duration,
    listened: Duration,
}

impl ScriptedReceiver {
    fn script(&mut self, fix: PositionFix) {
        self.scripted = fix;
    }

    fn scripted(&self) -> PositionFix {
        self.scripted
    }

    fn feed_nmea(&mut self, sentence: &str) -> Result<PositionFix, String> {
        for byte in sentence.trim().bytes().chain(*b"\r\n") {
            if let Some(result) = self.tracker.push_byte(byte) {
                return match result {
                    Ok(_) => {
                        self.scripted = self.tracker.fix();
                        Ok(self.scripted)
                    }
                    Err(err) => Err(err.to_string()),
                };
            }
        }
        Err("sentence does not start with `$`".to_string())
    }

    fn power_on(&self) -> Self {
        Self {
            listened: Duration::ZERO,
            ..self.clone()
        }
    }
}

impl FixProvider for ScriptedReceiver {
    fn drain<C: Clock>(&mut self, clock: &mut C, window: Duration) {
        clock.delay(window);
        self.listened += window;
    }

    fn current_fix(&self) -> PositionFix {
        if self.listened >= self.acquire_after {
            self.scripted
        } else {
            PositionFix::empty()
        }
    }
}

struct ConsolePresenter {
    output: Output,
    clock: VirtualClock,
}

impl ConsolePresenter {
    fn new(output: Output, clock: VirtualClock) -> Self {
        Self { output, clock }
    }
}

impl TextPresenter for ConsolePresenter {
    fn show_scrolling(&mut self, text: &str) {
        emit(&self.output, &self.clock, format!("display> {text}"));
    }

    fn show_static(&mut self, text: &str) {
        emit(&self.output, &self.clock, format!("display= {text}"));
    }
}

struct ConsoleLatch {
    output: Output,
    clock: VirtualClock,
}

impl ConsoleLatch {
    fn new(output: Output, clock: VirtualClock) -> Self {
        Self { output, clock }
    }
}

impl Latch for ConsoleLatch {
    fn set_position(&mut self, position: LatchPosition) {
        let label = match position {
            LatchPosition::Open => "open",
            LatchPosition::Closed => "closed",
        };
        emit(&self.output, &self.clock, format!("latch: {label}"));
    }
}

struct ConsoleRelay {
    output: Output,
    clock: VirtualClock,
    released: bool,
}

impl ConsoleRelay {
    fn new(output: Output, clock: VirtualClock) -> Self {
        Self {
            output,
            clock,
            released: false,
        }
    }
}

impl PowerSwitch for ConsoleRelay {
    fn cut_power(&mut self) {
        if !self.released {
            self.released = true;
            emit(&self.output, &self.clock, "power: relays released".to_string());
        }
    }
}

#[derive(Default)]
struct CountingBuzzer {
    tones: usize,
}

impl Buzzer for CountingBuzzer {
    fn play_tone(&mut self, _: u32) {
        self.tones += 1;
    }

    fn silence(&mut self) {}
}

#[derive(Default)]
struct CountingLed {
    blinks: usize,
}

impl StatusLed for CountingLed {
    fn set(&mut self, on: bool) {
        if on {
            self.blinks += 1;
        }
    }
}

/// Budget store persisted as `key=value` lines.
#[derive(Default)]
pub struct HostStore {
    values: BTreeMap<String, i32>,
    path: Option<PathBuf>,
}

impl HostStore {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut values = BTreeMap::new();
        match fs::read_to_string(path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let Some((key, value)) = line.split_once('=') else {
                        continue;
                    };
                    if let Ok(value) = value.trim().parse() {
                        values.insert(key.trim().to_string(), value);
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        Ok(Self {
            values,
            path: Some(path.to_path_buf()),
        })
    }

    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "memory".to_string(), |path| path.display().to_string())
    }

    fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut contents = String::new();
        for (key, value) in &self.values {
            contents.push_str(&format!("{key}={value}\n"));
        }
        fs::write(path, contents)
    }
}

impl KeyValueStore for HostStore {
    type Error = io::Error;

    fn get_int(&mut self, key: &str, default: i32) -> io::Result<i32> {
        Ok(self.values.get(key).copied().unwrap_or(default))
    }

    fn put_int(&mut self, key: &str, value: i32) -> io::Result<()> {
        self.values.insert(key.to_string(), value);
        self.persist()
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Mystery box emulator transcript")?;
        writeln!(
            self.writer,
            "# Session lines carry virtual time since power-on"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, power_on: usize, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[boot {power_on:>3}] {} {line}", role.prefix())?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&EmulatorOptions::default()).expect("in-memory session")
    }

    fn run(session: &mut Session, commands: &[&str]) -> Vec<String> {
        let mut lines = Vec::new();
        for command in commands {
            lines.extend(session.handle_command(command).expect("command"));
        }
        lines
    }

    #[test]
    fn parses_fix_with_location() {
        let fix = parse_fix("2022-06-04 23:05 52.0 5.1").expect("fix");
        assert_eq!((fix.year, fix.month, fix.day), (2022, 6, 4));
        assert_eq!((fix.hour, fix.minute, fix.second), (23, 5, 0));
        assert!(fix.location_valid);
        assert!(parse_fix("2022-13-04 10").is_err());
        assert!(parse_fix("2022-06-04 10 52.0").is_err());
    }

    #[test]
    fn opening_session_reports_latch_and_power_cut() {
        let mut session = session();
        let lines = run(
            &mut session,
            &["fix 2022-06-04 23:00", "near 4", "power"],
        );
        let latch = lines.iter().position(|line| line.ends_with("latch: open"));
        let power = lines
            .iter()
            .position(|line| line.ends_with("power: relays released"));
        assert!(latch.is_some());
        assert!(latch < power);
        assert!(
            lines
                .iter()
                .any(|line| line.contains("outcome=in-range-opened"))
        );
    }

    #[test]
    fn budget_persists_between_power_ons() {
        let mut session = session();
        run(&mut session, &["fix 2022-06-04 23:00", "near 800", "power"]);
        let lines = run(&mut session, &["power", "budget"]);
        assert_eq!(lines.last().map(String::as_str), Some("attempts left=8 max=10"));
    }

    #[test]
    fn late_acquisition_shows_take_outside_first() {
        let mut session = session();
        let lines = run(
            &mut session,
            &["fix 2022-06-03 12:00", "acquire 3", "power"],
        );
        let take_outside = lines
            .iter()
            .position(|line| line.ends_with("display> Take the mystery box outside!"));
        let tomorrow = lines
            .iter()
            .position(|line| line.ends_with("display> Not yet today, try again tomorrow!"));
        assert!(take_outside.is_some());
        assert!(take_outside < tomorrow);
    }

    #[test]
    fn nmea_sentence_updates_receiver() {
        let mut session = session();
        let lines = run(
            &mut session,
            &["nmea $GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A"],
        );
        assert_eq!(
            lines,
            vec!["OK nmea 2094-03-23 12:35:19Z lat=48.117300 lon=11.516667".to_string()]
        );
    }

    #[test]
    fn bench_supply_lingers_with_hour_readout() {
        let mut session = session();
        let lines = run(
            &mut session,
            &["bench on", "fix 2022-06-04 21:00", "power"],
        );
        assert!(lines.iter().any(|line| line.ends_with("display> hour: 21")));
    }
}
