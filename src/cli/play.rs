use crate::cli::controller::{ClickOutcome, MatchController};
use crate::cli::display::{display_match, prompt};
use crate::cli::validation::parse_cell;
use crate::messages::Message;
use crate::network::{ClientConfig, JoinRequest, SessionClient};
use anyhow::{anyhow, Result};
use std::io::{BufRead, BufReader, Write};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

const INBOX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read lines from `reader` on a dedicated thread and hand them to the async loops.
///
/// The read blocks and cannot be cancelled, so it stays off the runtime: leaving a game
/// drops the receiver and returns at once, and the detached thread ends with the process.
/// The channel closes at end of input or on a read error.
pub fn spawn_input_reader<R>(mut reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Could not start input reader: {}", e);
    }
    rx
}

fn input_lines() -> mpsc::UnboundedReceiver<String> {
    spawn_input_reader(BufReader::new(std::io::stdin()))
}

/// One line of player input
enum Input {
    Quit,
    Redraw,
    Click(crate::game::Coord),
}

fn parse_input(controller: &mut MatchController, line: &str) -> Input {
    match line.trim() {
        "q" | "quit" | "exit" => Input::Quit,
        "" => Input::Redraw,
        text => match parse_cell(text) {
            Ok(cell) => Input::Click(cell),
            Err(e) => {
                controller.set_message(e.to_string());
                Input::Redraw
            }
        },
    }
}

/// Pass-and-play until the game ends or the players quit
pub async fn run_local() -> Result<()> {
    let mut controller = MatchController::local();
    let mut lines = input_lines();

    loop {
        display_match(&controller);
        if controller.state().is_game_over() {
            break;
        }
        prompt(&controller);

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&mut controller, &line) {
            Input::Quit => break,
            Input::Redraw => {}
            Input::Click(cell) => {
                if let ClickOutcome::Moved(event) = controller.click(cell) {
                    debug!("Played {}", event.mv);
                }
            }
        }
    }
    Ok(())
}

/// Connect in the background while showing progress; Ctrl-C abandons the attempt
async fn connect_with_indicator(
    request: JoinRequest,
    config: ClientConfig,
) -> Result<Option<SessionClient>> {
    print!("Connecting to server...");
    std::io::stdout().flush().ok();

    let mut pending = SessionClient::spawn_connect(request, config);
    let mut ticker = interval(INBOX_POLL_INTERVAL);
    let mut ticks = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(None);
            }
        }

        match pending.poll() {
            Some(Ok(client)) => {
                println!(" connected");
                return Ok(Some(client));
            }
            Some(Err(e)) => {
                println!();
                return Err(anyhow!(e));
            }
            None => {
                ticks += 1;
                if ticks % 5 == 0 {
                    print!(".");
                    std::io::stdout().flush().ok();
                }
            }
        }
    }
}

/// Join `request.room` on the relay and play until quit, game over or disconnect
pub async fn run_online(request: JoinRequest, config: ClientConfig) -> Result<()> {
    let mut controller = MatchController::online(request.name.clone());
    let Some(mut client) = connect_with_indicator(request, config).await? else {
        return Ok(());
    };

    let mut lines = input_lines();
    let mut ticker = interval(INBOX_POLL_INTERVAL);
    let mut redraw = true;

    loop {
        if redraw {
            display_match(&controller);
            prompt(&controller);
            redraw = false;
        }

        tokio::select! {
            _ = ticker.tick() => {
                for message in client.drain() {
                    if let Some(event) = controller.handle_message(message) {
                        debug!("Opponent played {}", event.mv);
                    }
                    redraw = true;
                }
                if !client.is_alive() {
                    controller.set_message("Connection to relay lost");
                    display_match(&controller);
                    break;
                }
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                match parse_input(&mut controller, &line) {
                    Input::Quit => break,
                    Input::Redraw => {}
                    Input::Click(cell) => {
                        if let ClickOutcome::Moved(event) = controller.click(cell) {
                            if let Err(e) = client.send(&Message::from(event.mv)) {
                                warn!("Could not send move: {}", e);
                                controller.set_message(format!("Move not sent: {}", e));
                            }
                        }
                    }
                }
                redraw = true;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!(
        dropped = client.dropped_messages(),
        "Leaving online session"
    );
    client.close();
    Ok(())
}
