//! Interactive brewing from the terminal.
//!
//! One task reads single-letter commands from stdin while the controller's
//! events are printed as they arrive. The controller never waits on input.

use std::io::Write;

use anyhow::{anyhow, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use crate::{
    catalog::{BrewParameters, BrewingStyle},
    mindfulness::{session_cue, stage_practice},
    settings::Settings,
    timer::{BrewController, BrewEvent, BrewPlan, BrewSnapshot, BrewStage},
    log_warn, AppState,
};

const ENABLE_LOGS: bool = true;

const HELP: &str = "commands: s start, n next steep, p pause, r resume, c complete, a another, q back/quit";

/// How mindfulness text is chosen while brewing.
#[derive(Debug, Clone)]
pub enum Guide {
    Off,
    /// Stage-based practice for a single catalog brew.
    Practice,
    /// Rotating prompts from a session theme.
    Theme(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub fn list_teas(state: &AppState) -> Result<()> {
    let settings = state.settings.get();
    for tea in state.catalog.teas() {
        println!("{:<14} {}", tea.id, tea.name);
        println!(
            "    western: {} for {}, {}",
            settings.format_temperature(tea.temperature),
            format_clock(tea.steep_time),
            tea.tea_amount
        );
        if let Some(gongfu) = &tea.gongfu {
            println!(
                "    gongfu:  {} from {} (+7s per steep, up to {}), {}",
                settings.format_temperature(gongfu.temperature),
                format_clock(gongfu.first_steep_time),
                gongfu.max_infusions,
                gongfu.tea_amount
            );
        }
    }
    Ok(())
}

pub async fn brew_tea(
    state: &AppState,
    tea_id: &str,
    style: Option<BrewingStyle>,
) -> Result<()> {
    let settings = state.settings.get();
    let tea = state
        .catalog
        .get_tea_by_id(tea_id)
        .ok_or_else(|| anyhow!("unknown tea '{tea_id}'; see `teabrew teas`"))?;
    let style = style.unwrap_or(settings.default_style);
    let params = tea
        .parameters(style)
        .ok_or_else(|| anyhow!("{} has no {} parameters", tea.name, style))?;
    let plan = BrewPlan::from_parameters(&params)?;

    println!("{} ({})", tea.name, style);
    print_parameters(&settings, &params);

    let guide = if settings.mindfulness.enabled {
        Guide::Practice
    } else {
        Guide::Off
    };
    let controller = BrewController::new(plan);
    drive(&controller, &settings, guide).await
}

pub async fn brew_session(state: &AppState, session_id: &str) -> Result<()> {
    let settings = state.settings.get();
    let controller = BrewController::for_session(state.store.clone(), session_id).await?;
    let session = state
        .store
        .get(session_id)
        .await
        .ok_or_else(|| anyhow!("session {session_id} not found"))?;

    println!(
        "{}: {} at {}, steep {}/{}",
        session.name,
        session.tea_type,
        settings.format_temperature(session.water_temperature),
        session.current_steep,
        session.total_steeps
    );

    let guide = if session.mindfulness_enabled {
        Guide::Theme(session.mindfulness_theme.clone())
    } else {
        Guide::Off
    };
    drive(&controller, &settings, guide).await
}

fn print_parameters(settings: &Settings, params: &BrewParameters) {
    println!("  water:  {}", settings.format_temperature(params.temperature_c));
    println!("  leaves: {}", params.tea_amount);
    println!("  steep:  {}", format_clock(params.steep_time_secs));
    if params.max_infusions > 1 {
        println!("  up to {} infusions", params.max_infusions);
    }
    if let Some(rinse) = &params.rinse {
        println!(
            "  rinse the leaves {}x for {}s before the first steep",
            rinse.count, rinse.duration_secs
        );
    }
}

async fn drive(controller: &BrewController, settings: &Settings, guide: Guide) -> Result<()> {
    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_cue: Option<&'static str> = None;

    println!("{HELP}");
    if controller.snapshot().await.stage == BrewStage::Preparation {
        controller.begin().await?;
    } else {
        print_snapshot(&controller.snapshot().await);
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if render(&event, settings, &guide, &mut last_cue) == Flow::Stop {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!("[brew] display fell behind by {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_input(controller, line.trim()).await {
                    Ok(Flow::Stop) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => println!("\n{err}"),
                }
            }
        }
    }

    controller.shutdown();
    Ok(())
}

async fn handle_input(controller: &BrewController, input: &str) -> Result<Flow> {
    match input {
        "" => {}
        "s" => {
            controller.begin().await?;
        }
        "n" => {
            controller.next_steep().await?;
        }
        "p" => {
            controller.pause().await?;
        }
        "r" => {
            controller.resume().await?;
        }
        "c" => {
            controller.complete().await?;
        }
        "a" => {
            controller.brew_another().await?;
            controller.begin().await?;
        }
        "q" => {
            if controller.snapshot().await.stage == BrewStage::Preparation {
                return Ok(Flow::Stop);
            }
            controller.cancel().await;
        }
        "?" | "h" => println!("{HELP}"),
        other => println!("unknown command '{other}'; {HELP}"),
    }
    Ok(Flow::Continue)
}

fn render(
    event: &BrewEvent,
    settings: &Settings,
    guide: &Guide,
    last_cue: &mut Option<&'static str>,
) -> Flow {
    match event {
        BrewEvent::StageChanged { transition, snapshot } => {
            *last_cue = None;
            match transition.to {
                BrewStage::Heating => println!(
                    "\nSteep {}/{}: heating water to {}",
                    snapshot.current_steep,
                    snapshot.total_steeps,
                    settings.format_temperature(snapshot.temperature_c)
                ),
                BrewStage::Steeping => println!(
                    "\nPour and steep for {}",
                    format_clock(transition.duration_secs)
                ),
                BrewStage::Ready => {
                    if snapshot.current_steep < snapshot.total_steeps {
                        println!("\nSteep {} ready. `n` for the next steep.", snapshot.current_steep);
                    } else {
                        println!("\nTea ready. `c` to finish.");
                    }
                }
                BrewStage::Completed => {
                    println!(
                        "\nSession complete: {} of {} steeps enjoyed.",
                        snapshot.completed_steeps.len(),
                        snapshot.total_steeps
                    );
                    return Flow::Stop;
                }
                BrewStage::Preparation => println!("\nBack to preparation. `s` to start."),
            }
        }
        BrewEvent::Tick {
            stage,
            remaining_secs,
            total_secs,
            ..
        } => {
            print!("\r{:<10} {}   ", stage.as_str(), format_clock(*remaining_secs));
            let _ = std::io::stdout().flush();

            let elapsed = u64::from(total_secs.saturating_sub(*remaining_secs));
            if let Some(cue) = cue_text(guide, *stage, elapsed) {
                if *last_cue != Some(cue) {
                    *last_cue = Some(cue);
                    println!("\n  ~ {cue}");
                }
            }
        }
        BrewEvent::Paused { snapshot } => {
            println!("\nPaused at {}", format_clock(snapshot.remaining_secs));
        }
        BrewEvent::Resumed { snapshot } => {
            println!("\nResumed with {} left", format_clock(snapshot.remaining_secs));
        }
        BrewEvent::Cancelled { .. } => println!("\nStopped. `s` to start again, `q` to quit."),
        BrewEvent::SessionRemoved { session_id } => {
            println!("\nSession {session_id} was deleted; stopping.");
            return Flow::Stop;
        }
    }
    Flow::Continue
}

fn cue_text(guide: &Guide, stage: BrewStage, elapsed_secs: u64) -> Option<&'static str> {
    match guide {
        Guide::Off => None,
        Guide::Practice => {
            let practice = stage_practice(stage, elapsed_secs);
            practice
                .reflection
                .or_else(|| practice.breath.map(|phase| phase.as_str()))
        }
        Guide::Theme(theme) if stage == BrewStage::Steeping => {
            Some(session_cue(theme, 1, elapsed_secs).prompt)
        }
        Guide::Theme(_) => None,
    }
}

fn print_snapshot(snapshot: &BrewSnapshot) {
    println!(
        "{} (steep {}/{}), {} left",
        snapshot.stage,
        snapshot.current_steep,
        snapshot.total_steeps,
        format_clock(snapshot.remaining_secs)
    );
}

/// `95` → `"1:35"`
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindfulness::THEMES;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(95), "1:35");
        assert_eq!(format_clock(600), "10:00");
    }

    #[test]
    fn theme_cues_only_while_steeping() {
        let guide = Guide::Theme("Focus on Aroma".into());
        assert_eq!(cue_text(&guide, BrewStage::Heating, 3), None);
        assert_eq!(
            cue_text(&guide, BrewStage::Steeping, 13),
            Some(THEMES[0].prompts[1])
        );
        assert_eq!(cue_text(&Guide::Off, BrewStage::Steeping, 13), None);
    }

    #[test]
    fn practice_cues_follow_breath_then_reflection() {
        assert_eq!(cue_text(&Guide::Practice, BrewStage::Heating, 0), Some("inhale"));
        assert_eq!(
            cue_text(&Guide::Practice, BrewStage::Steeping, 0),
            Some("What am I grateful for in this moment?")
        );
    }
}
