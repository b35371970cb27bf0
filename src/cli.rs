//! CLI definition and dispatch.

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapters::csv_feed_adapter::CsvFeedAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::config::DashboardConfig;
use crate::domain::config_validation::{require_data_dir, validate_dashboard_config};
use crate::domain::dashboard::DashboardSnapshot;
use crate::domain::error::TradewindError;
use crate::domain::indicator::{IndicatorKind, IndicatorSpec, IndicatorValue};
use crate::domain::position::Side;
use crate::domain::timeframe::Timeframe;
use crate::domain::viewport::ZoomAction;
use crate::ports::feed_port::FeedPort;
use crate::scheduler::{Notice, PollScheduler, UserCommand};

#[derive(Parser, Debug)]
#[command(name = "tradewind", about = "Live market-data dashboard core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the poll loop, reading commands from stdin
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Symbol to start on (defaults to the first configured)
        #[arg(long)]
        symbol: Option<String>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Seed history, poll bars once and print the dashboard state
    Snapshot {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a dashboard configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            symbol,
            seconds,
        } => run_dashboard(&config, symbol, seconds),
        Command::Snapshot { config, symbol } => run_snapshot(&config, symbol),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: TradewindError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

/// Load, validate and assemble the settings plus the CSV data directory.
fn load_dashboard(path: &Path) -> Result<(DashboardConfig, PathBuf), ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_dashboard_config(&adapter).map_err(fail)?;
    let data_dir = require_data_dir(&adapter).map_err(fail)?;
    let config = DashboardConfig::from_port(&adapter).map_err(fail)?;
    Ok((config, PathBuf::from(data_dir)))
}

fn build_ports(data_dir: PathBuf, config: &DashboardConfig) -> (Arc<dyn FeedPort>, Arc<PaperBroker>) {
    let feed: Arc<dyn FeedPort> = Arc::new(CsvFeedAdapter::new(data_dir));
    let broker = Arc::new(PaperBroker::new(Arc::clone(&feed), config.trading.contract_size));
    (feed, broker)
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Runtime::new().map_err(|e| fail(TradewindError::Io(e)))
}

fn run_validate(config_path: &Path) -> ExitCode {
    let (config, data_dir) = match load_dashboard(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    eprintln!("Config OK");
    eprintln!("  data dir:  {}", data_dir.display());
    eprintln!("  symbols:   {}", config.feed.symbols.join(", "));
    eprintln!(
        "  cadence:   tick {} ms, bars {} ms, zoom repeat {} ms",
        config.cadence.tick_interval.as_millis(),
        config.cadence.bar_interval.as_millis(),
        config.cadence.zoom_repeat.as_millis()
    );
    eprintln!("  timeframe: {} x {} bars", config.timeframe, config.bar_count);
    eprintln!("  indicator: {}", config.indicator);
    eprintln!("  lot:       {}", config.trading.lot);
    ExitCode::SUCCESS
}

fn run_snapshot(config_path: &Path, symbol: Option<String>) -> ExitCode {
    let (config, data_dir) = match load_dashboard(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let symbol = symbol.unwrap_or_else(|| config.initial_symbol().to_string());
    let offset = config.utc_offset;
    let (feed, broker) = build_ports(data_dir, &config);

    let result = rt.block_on(async move {
        let mut scheduler = PollScheduler::new(config, &symbol, feed, broker);
        scheduler.init().await?;
        scheduler.poll_tick().await;
        Ok::<_, TradewindError>(scheduler.snapshot())
    });
    rt.shutdown_background();

    match result {
        Ok(snapshot) => {
            print_snapshot(&snapshot, offset);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_dashboard(config_path: &Path, symbol: Option<String>, seconds: Option<u64>) -> ExitCode {
    let (config, data_dir) = match load_dashboard(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let symbol = symbol.unwrap_or_else(|| config.initial_symbol().to_string());
    let offset = config.utc_offset;
    let report_every = config.cadence.bar_interval.max(Duration::from_millis(1));
    let (feed, broker) = build_ports(data_dir, &config);

    let paper = Arc::clone(&broker);
    let code = rt.block_on(async move {
        let mut scheduler = PollScheduler::new(config, &symbol, feed, broker);
        if let Err(e) = scheduler.init().await {
            return fail(e);
        }
        let mut handle = scheduler.spawn();
        spawn_stdin_reader(handle.commands.clone());

        let stop = async {
            match seconds {
                Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(stop);
        let mut report = tokio::time::interval(report_every);

        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("time limit reached");
                    break;
                }
                _ = report.tick() => {
                    println!("{}", summary_line(&handle.snapshots.borrow(), offset));
                }
                Some(notice) = handle.notices.recv() => print_notice(&notice),
                changed = handle.snapshots.changed() => {
                    // The loop dropped its sender: it has stopped.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        handle.shutdown().await;
        match paper.realized_pl() {
            Ok(realized) => eprintln!("realized P/L: {realized:.2}"),
            Err(e) => warn!("realized P/L unavailable: {e}"),
        }
        ExitCode::SUCCESS
    });
    rt.shutdown_background();
    code
}

/// Read commands on a plain thread; tokio's stdin is not meant for
/// interactive input.
fn spawn_stdin_reader(commands: mpsc::Sender<UserCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(command) => {
                    let quit = matches!(command, UserCommand::Shutdown);
                    if commands.blocking_send(command).is_err() || quit {
                        break;
                    }
                }
                Err(msg) => eprintln!("error: {msg}"),
            }
        }
        debug!("stdin reader finished");
    });
}

fn parse_timeframe(arg: &str) -> Result<Timeframe, String> {
    if let Some(tf) = Timeframe::ALL.iter().find(|tf| tf.to_string() == arg) {
        return Ok(*tf);
    }
    arg.parse::<u32>()
        .ok()
        .and_then(Timeframe::from_minutes)
        .ok_or_else(|| format!("unknown timeframe '{arg}', expected 1, 5, 60, 240 or 1440"))
}

fn parse_number<T: std::str::FromStr>(arg: &str, what: &str) -> Result<T, String> {
    arg.parse().map_err(|_| format!("invalid {what} '{arg}'"))
}

/// Turn one line of user input into a command.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Err("empty command".into());
    };
    match (verb.to_ascii_lowercase().as_str(), args) {
        ("buy" | "sell", []) => Ok(UserCommand::Place {
            side: verb.parse::<Side>()?,
            volume: None,
        }),
        ("buy" | "sell", [lot]) => Ok(UserCommand::Place {
            side: verb.parse::<Side>()?,
            volume: Some(parse_number(lot, "lot")?),
        }),
        ("close", []) => Ok(UserCommand::CloseAll),
        ("zoom", [dir]) => Ok(UserCommand::Zoom(dir.parse::<ZoomAction>()?)),
        ("hold", [dir]) => Ok(UserCommand::HoldZoom(dir.parse::<ZoomAction>()?)),
        ("release", []) => Ok(UserCommand::ReleaseZoom),
        ("tf", [arg]) => Ok(UserCommand::SelectInterval(parse_timeframe(arg)?)),
        ("indicator", [kind, rest @ ..]) if rest.len() <= 2 => {
            let defaults = IndicatorSpec::default();
            let kind = kind.parse::<IndicatorKind>()?;
            let period = match rest.first() {
                Some(p) => parse_number(p, "period")?,
                None => defaults.period,
            };
            let deviation = match rest.get(1) {
                Some(d) => parse_number(d, "deviation")?,
                None => defaults.deviation,
            };
            Ok(UserCommand::ApplyIndicator(IndicatorSpec::new(
                kind, period, deviation,
            )))
        }
        ("symbol", [name]) => Ok(UserCommand::SelectSymbol((*name).to_string())),
        ("quit" | "exit", []) => Ok(UserCommand::Shutdown),
        _ => Err(format!("unrecognised command '{}'", line.trim())),
    }
}

fn format_time(seconds: f64, format: &str, offset: FixedOffset) -> String {
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
        .map(|t| t.with_timezone(&offset).format(format).to_string())
        .unwrap_or_else(|| format!("{seconds:.0}"))
}

fn indicator_summary(snapshot: &DashboardSnapshot) -> Option<String> {
    let series = snapshot.indicators.first()?;
    let point = series.last_valid()?;
    Some(match point.value {
        IndicatorValue::Simple(v) => format!("{}={v:.5}", snapshot.indicator),
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => format!("{}={lower:.5}/{middle:.5}/{upper:.5}", snapshot.indicator),
    })
}

/// One status line, printed per bar cadence while running.
pub fn summary_line(snapshot: &DashboardSnapshot, offset: FixedOffset) -> String {
    let mut parts = vec![format!("{} {}", snapshot.symbol, snapshot.timeframe)];
    match snapshot.quote {
        Some(q) => parts.push(format!("bid={:.5} ask={:.5}", q.bid, q.ask)),
        None => parts.push("bid=- ask=-".to_string()),
    }
    if let Some(bar) = snapshot.bars.last() {
        parts.push(format!(
            "bar[{}] c={:.5}",
            format_time(bar.time, snapshot.axis.label_format(), offset),
            bar.close
        ));
    }
    if let Some(ind) = indicator_summary(snapshot) {
        parts.push(ind);
    }
    if let Some((lo, hi)) = snapshot.viewport.y_range {
        parts.push(format!("y=[{lo:.5}, {hi:.5}]"));
    }
    parts.push(snapshot.pl_label());
    parts.join(" ")
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::OrderPlaced {
            ticket,
            side,
            volume,
        } => eprintln!("{side} {volume} filled, ticket {ticket}"),
        Notice::PositionsClosed(report) => {
            eprintln!("closed {} position(s)", report.closed.len());
            if !report.is_complete() {
                eprintln!("{} close(s) failed:", report.failed.len());
            }
            for (ticket, err) in &report.failed {
                eprintln!("  ticket {ticket}: {err}");
            }
        }
        Notice::Rejected(err) => eprintln!("rejected: {err}"),
    }
}

fn print_snapshot(snapshot: &DashboardSnapshot, offset: FixedOffset) {
    let format = snapshot.axis.label_format();
    println!("{} {} ({} bars)", snapshot.symbol, snapshot.timeframe, snapshot.bars.len());
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12}",
        "time", "open", "high", "low", "close"
    );
    for bar in &snapshot.bars {
        println!(
            "{:<20} {:>12.5} {:>12.5} {:>12.5} {:>12.5}",
            format_time(bar.time, format, offset),
            bar.open,
            bar.high,
            bar.low,
            bar.close
        );
    }

    for series in &snapshot.indicators {
        for line in series.lines() {
            let last = line.points.iter().rev().find_map(|(_, v)| *v);
            match last {
                Some(v) => println!("{}: {v:.5}", line.name),
                None => println!("{}: -", line.name),
            }
        }
    }

    if let Some((left, right)) = snapshot.viewport.x_range {
        println!(
            "x range: {} .. {} ({}s scale)",
            format_time(left, "%H:%M:%S", offset),
            format_time(right, "%H:%M:%S", offset),
            snapshot.viewport.x_scale_seconds
        );
    }
    if let Some((lo, hi)) = snapshot.viewport.y_range {
        println!("y range: {lo:.5} .. {hi:.5} (zoom {})", snapshot.viewport.y_zoom_factor);
    }
    println!("ticks buffered: {}", snapshot.samples.len());
    if let Some(q) = snapshot.quote {
        println!("bid {:.5} ask {:.5} spread {:.5}", q.bid, q.ask, q.spread());
    }
    println!("{}", snapshot.pl_label());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_orders() {
        assert_eq!(
            parse_command("buy").unwrap(),
            UserCommand::Place {
                side: Side::Buy,
                volume: None
            }
        );
        assert_eq!(
            parse_command("sell 0.5").unwrap(),
            UserCommand::Place {
                side: Side::Sell,
                volume: Some(0.5)
            }
        );
        assert!(parse_command("buy lots").is_err());
        assert_eq!(parse_command("close").unwrap(), UserCommand::CloseAll);
    }

    #[test]
    fn parses_zoom_controls() {
        assert_eq!(
            parse_command("zoom in-x").unwrap(),
            UserCommand::Zoom(ZoomAction::InX)
        );
        assert_eq!(
            parse_command("hold out-y").unwrap(),
            UserCommand::HoldZoom(ZoomAction::OutY)
        );
        assert_eq!(parse_command("release").unwrap(), UserCommand::ReleaseZoom);
        assert!(parse_command("zoom diagonal").is_err());
    }

    #[test]
    fn parses_timeframe_by_minutes_or_label() {
        assert_eq!(
            parse_command("tf 60").unwrap(),
            UserCommand::SelectInterval(Timeframe::H1)
        );
        assert_eq!(
            parse_command("tf 4H").unwrap(),
            UserCommand::SelectInterval(Timeframe::H4)
        );
        assert!(parse_command("tf 15").is_err());
    }

    #[test]
    fn parses_indicator_with_defaults() {
        assert_eq!(
            parse_command("indicator ema").unwrap(),
            UserCommand::ApplyIndicator(IndicatorSpec::new(IndicatorKind::Ema, 20, 2.0))
        );
        assert_eq!(
            parse_command("indicator bollinger 14 2.5").unwrap(),
            UserCommand::ApplyIndicator(IndicatorSpec::new(IndicatorKind::Bollinger, 14, 2.5))
        );
        assert!(parse_command("indicator sma x").is_err());
        assert!(parse_command("indicator sma 1 2 3").is_err());
    }

    #[test]
    fn parses_symbol_and_quit() {
        assert_eq!(
            parse_command("symbol USDJPY").unwrap(),
            UserCommand::SelectSymbol("USDJPY".into())
        );
        assert_eq!(parse_command("  QUIT ").unwrap(), UserCommand::Shutdown);
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn formats_bar_time_in_local_offset() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        // 2024-06-03 01:30:00 UTC
        assert_eq!(format_time(1_717_378_200.0, "%H:%M", tokyo), "10:30");
    }
}
