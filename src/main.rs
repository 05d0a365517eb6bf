// SPDX-License-Identifier: MIT
//
// n-dash: a live market board drawn through n-render.
//
// Two threads feed one renderer:
//
//   feed thread  → moves prices, schedules a frame when any moved
//   main thread  → ticks the clock once per interval, schedules a frame
//
// Whichever thread finds the renderer idle produces the frame; the other's
// update coalesces behind it. Only rows whose price moved are repainted,
// the rest are blitted from the surface cache, and only changed rows reach
// the terminal.
//
// Either thread may build a tree a moment before the other moves a price,
// so dirty marks can't be tied to a particular tree. The board runs with
// `trust_dirty_tracking` off and lets fingerprints find what changed.
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ n-dash · tick 42             │  ← root title (changes every tick)
//   │ Prices                       │  ← panel title
//   │ BTC    64 210.50  ▲          │  ← one Text per symbol
//   │ ...                          │
//   │ Frames                       │
//   │ painted 2  hits 9  412 B     │  ← last frame report
//   └──────────────────────────────┘
//
// Usage: n-dash [--frames N] [--interval MS] [--log PATH]
//
// Logs never go to stdout: without `--log` nothing is recorded.

use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use n_render::cell::{Attr, Style};
use n_render::config::RendererConfig;
use n_render::env::TerminalEnvironment;
use n_render::error::Result;
use n_render::geometry::Size;
use n_render::node::{NodeId, Renderable, Stack, Text};
use n_render::renderer::Renderer;
use n_render::sink::StdoutSink;
use n_render::telemetry::FrameReport;
use n_render::terminal::{self, AltScreen};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const FALLBACK_SIZE: Size = Size::new(80, 24);

const UP: Style = Style::new().fg(2);
const DOWN: Style = Style::new().fg(1);
const TITLE: Style = Style::new().attrs(Attr::BOLD);
const MUTED: Style = Style::new().attrs(Attr::DIM);

// ─── Arguments ──────────────────────────────────────────────────────────────

struct Args {
    frames: u64,
    interval: Duration,
    log: Option<String>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut args = Args {
        frames: 100,
        interval: Duration::from_millis(100),
        log: None,
    };
    let mut iter = env::args().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--frames" => {
                args.frames = value()?.parse().map_err(|e| format!("--frames: {e}"))?;
            }
            "--interval" => {
                let ms: u64 = value()?.parse().map_err(|e| format!("--interval: {e}"))?;
                args.interval = Duration::from_millis(ms.max(1));
            }
            "--log" => args.log = Some(value()?),
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok(args)
}

fn init_logging(path: Option<&str>) {
    let Some(path) = path else { return };
    let Ok(file) = std::fs::File::create(path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .with(filter)
        .init();
}

// ─── Market ─────────────────────────────────────────────────────────────────

struct Quote {
    id: NodeId,
    symbol: &'static str,
    cents: i64,
    change: i64,
}

/// Deterministic random walk over a handful of symbols.
struct Market {
    quotes: Vec<Quote>,
    seed: u64,
}

impl Market {
    fn new() -> Self {
        let listings = [
            ("BTC", 6_421_050),
            ("ETH", 341_275),
            ("SOL", 14_220),
            ("ADA", 45),
            ("DOT", 712),
            ("XMR", 16_480),
        ];
        Self {
            quotes: listings
                .into_iter()
                .map(|(symbol, cents)| Quote {
                    id: NodeId::next(),
                    symbol,
                    cents,
                    change: 0,
                })
                .collect(),
            seed: 0x9e37_79b9_7f4a_7c15,
        }
    }

    fn next_random(&mut self) -> u64 {
        // xorshift64
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 7;
        self.seed ^= self.seed << 17;
        self.seed
    }

    /// Move a few prices. Returns how many moved.
    fn step(&mut self) -> usize {
        let mut moved = 0;
        for i in 0..self.quotes.len() {
            let roll = self.next_random();
            if roll % 3 != 0 {
                continue;
            }
            let quote = &mut self.quotes[i];
            let step = (quote.cents / 500).max(1);
            let delta = if roll & 0x10 == 0 { step } else { -step };
            quote.cents = (quote.cents + delta).max(1);
            quote.change = delta;
            moved += 1;
        }
        moved
    }
}

fn price(cents: i64) -> String {
    let whole = cents / 100;
    let mut digits = whole.to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        grouped = format!(" {tail}{grouped}");
    }
    format!("{digits}{grouped}.{:02}", cents % 100)
}

// ─── Board ──────────────────────────────────────────────────────────────────

struct Board {
    root: NodeId,
    prices: NodeId,
    frames: NodeId,
    stats: NodeId,
}

impl Board {
    fn new() -> Self {
        Self {
            root: NodeId::next(),
            prices: NodeId::next(),
            frames: NodeId::next(),
            stats: NodeId::next(),
        }
    }

    fn tree(&self, market: &Market, tick: u64, report: Option<FrameReport>) -> Arc<dyn Renderable> {
        let rows = market.quotes.iter().map(|q| -> Arc<dyn Renderable> {
            let (arrow, style) = match q.change.signum() {
                1 => ("▲", UP),
                -1 => ("▼", DOWN),
                _ => (" ", Style::DEFAULT),
            };
            let line = format!("{:<6}{:>14}  {arrow}", q.symbol, price(q.cents));
            Arc::new(Text::new(q.id, line).style(style))
        });
        let prices = Stack::new(self.prices).title("Prices", TITLE).with_children(rows);

        let summary = report.map_or_else(
            || "waiting for first frame".to_owned(),
            |r| {
                format!(
                    "#{}  painted {}  hits {}  {} B",
                    r.frame, r.stats.nodes_painted, r.stats.cache_hits, r.stats.bytes_written
                )
            },
        );
        let frames = Stack::new(self.frames)
            .title("Frames", TITLE)
            .child(Arc::new(Text::new(self.stats, summary).style(MUTED)));

        Arc::new(
            Stack::new(self.root)
                .title(format!("n-dash · tick {tick}"), TITLE)
                .child(Arc::new(prices))
                .child(Arc::new(frames)),
        )
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<()> {
    let base = TerminalEnvironment::detect(terminal::get_size().unwrap_or(FALLBACK_SIZE));
    let source = move || base.with_size(terminal::get_size().unwrap_or(base.size));

    let config = RendererConfig {
        trust_dirty_tracking: false,
        ..RendererConfig::default()
    };
    let renderer = Arc::new(Renderer::new(config, StdoutSink::new(), source)?);
    let screen = if terminal::is_stdout_tty() {
        Some(AltScreen::enter()?)
    } else {
        None
    };

    let board = Arc::new(Board::new());
    let market = Arc::new(Mutex::new(Market::new()));
    let tick = Arc::new(Mutex::new(0_u64));
    let stop = Arc::new(AtomicBool::new(false));

    let render = {
        let renderer = Arc::clone(&renderer);
        let board = Arc::clone(&board);
        let market = Arc::clone(&market);
        let tick = Arc::clone(&tick);
        move || {
            let tick = tick.lock().map_or(0, |t| *t);
            let tree = match market.lock() {
                Ok(market) => board.tree(&market, tick, renderer.last_report()),
                Err(_) => return,
            };
            renderer.schedule_render(tree);
        }
    };

    let feed = {
        let market = Arc::clone(&market);
        let stop = Arc::clone(&stop);
        let render = render.clone();
        let pace = args.interval / 2;
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let moved = market.lock().map(|mut m| m.step()).unwrap_or_default();
                if moved > 0 {
                    render();
                }
                thread::sleep(pace);
            }
        })
    };

    for _ in 0..args.frames {
        if let Ok(mut t) = tick.lock() {
            *t += 1;
        }
        render();
        thread::sleep(args.interval);
    }

    stop.store(true, Ordering::Relaxed);
    if feed.join().is_err() {
        tracing::warn!("feed thread panicked");
    }
    renderer.shutdown();
    if let Some(screen) = screen {
        screen.leave()?;
    }

    let cache = renderer.cache().stats();
    println!(
        "n-dash: {} frames, {} cache hits, {} misses, {} evictions",
        renderer.frames_produced(),
        cache.hits,
        cache.misses,
        cache.evictions
    );
    Ok(())
}

fn main() {
    let args = parse_args().unwrap_or_else(|e| {
        eprintln!("n-dash: {e}");
        eprintln!("usage: n-dash [--frames N] [--interval MS] [--log PATH]");
        process::exit(2);
    });
    init_logging(args.log.as_deref());

    if let Err(e) = run(&args) {
        eprintln!("n-dash: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
