use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use winit::{
    dpi,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::WindowBuilder,
};

use kanade_chart::{load_chart, FileList};
use kanade_play::{MonotonicClock, PlayConfig, Session, SessionStatus, Tier, TimeSource};

/// Step of the simulated clock in headless mode.
const HEADLESS_FRAME_MS: f64 = 4.0;

#[derive(Parser, Debug)]
#[command(version, about = "Plays osu!mania charts")]
struct Args {
    /// Path of the .osu chart.
    chart: PathBuf,

    /// Playback rate.
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    #[arg(long)]
    autoplay: bool,

    /// Runs an autoplay session without opening a window.
    #[arg(long)]
    headless: bool,

    /// JSON play config. Defaults are used when missing.
    #[arg(long, default_value = "kanade.json")]
    config: PathBuf,

    /// Overrides the judge offset of the config, in milliseconds.
    #[arg(long, allow_negative_numbers = true)]
    judge_offset: Option<f64>,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("KANADE_LOG_LEVEL", "info")
        .write_style_or("KANADE_LOG_STYLE", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();

    let mut config = PlayConfig::load(&args.config)?;
    if let Some(judge_offset) = args.judge_offset {
        config.judge_offset = judge_offset;
    }
    config.autoplay |= args.autoplay || args.headless;

    let chart = load_chart(&FileList::new(vec![args.chart.clone()]), 0)?;
    if !chart.header.is_mania() {
        log::warn!("Chart mode is {:?}, playing it as mania", chart.header.mode);
    }
    log::info!(
        "\"{}\" by {}, mapped by {}, {} BPM",
        chart.header.title,
        chart.header.artist,
        chart.header.creator,
        chart
            .original()
            .dominant_bpm()
            .map_or_else(|| "?".to_string(), |bpm| format!("{:.0}", bpm))
    );

    if args.headless {
        run_headless(Session::start(chart, args.rate, config, 0.0)?);
        return Ok(());
    }

    if config.key_bindings.lanes(chart.key_count()).is_none() {
        bail!("No key bindings for {} keys", chart.key_count());
    }

    let clock = MonotonicClock::new();
    let mut session = Session::start(chart, args.rate, config, clock.now_ms())?;

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("kanade")
        .with_inner_size(dpi::PhysicalSize::new(1280, 720))
        .build(&event_loop)?;

    event_loop.run(move |event, eltw| {
        eltw.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                // Summary and exit happen on the next frame tick.
                WindowEvent::CloseRequested => session.stop(),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state,
                            repeat: false,
                            ..
                        },
                    ..
                } => {
                    let key_count = session.chart().key_count();
                    let key = format!("{:?}", code);
                    let Some(lane) = session.config().key_bindings.lane_for(key_count, &key)
                    else {
                        return;
                    };

                    let now = clock.now_ms();
                    match state {
                        ElementState::Pressed => session.key_down(lane, now),
                        ElementState::Released => session.key_up(lane, now),
                    };
                }
                WindowEvent::RedrawRequested => {
                    let feedback = session.take_feedback();
                    if feedback.judgment_pulse {
                        if let Some(tier) = session.state().last_judgment() {
                            log::trace!(
                                "{} x{}",
                                tier.text(),
                                session.state().combo().current()
                            );
                        }
                    }
                }
                _ => (),
            },
            Event::AboutToWait => {
                if session.tick(clock.now_ms()) == SessionStatus::Ended {
                    log_summary(&session);
                    eltw.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => (),
        }
    })?;

    Ok(())
}

/// Feeds the session a simulated clock until it ends.
fn run_headless(mut session: Session) {
    let mut now = 0.0;
    while session.tick(now) == SessionStatus::Playing {
        now += HEADLESS_FRAME_MS;
    }
    log_summary(&session);
}

fn log_summary(session: &Session) {
    let ledger = session.state().ledger();
    let counts = ledger.tier_counts();

    log::info!(
        "Accuracy {}, max combo {}",
        ledger
            .accuracy()
            .map_or_else(|| "-".to_string(), |accuracy| format!("{:.2}%", accuracy * 100.0)),
        session.state().combo().max()
    );
    for tier in Tier::ALL {
        log::info!("{:>12} {}", tier.text(), counts.get(tier));
    }
}
