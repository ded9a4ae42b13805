use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use canvas_core::{ClientMessage, Color, Position, ServerMessage};
use canvas_protocol::{decode_server, encode_client};
use canvas_server::transport::{tcp_transport, FrameSink, FrameSource};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<()> {
    // Where to connect and who to be: env overrides or defaults.
    let addr = env::var("CANVAS_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9100".to_string());
    let token = env::var("CANVAS_CLIENT_TOKEN").unwrap_or_else(|_| "painter".to_string());

    println!("Connecting to {} as {:?}...", addr, token);
    let stream = TcpStream::connect(&addr).await?;
    let (mut frames, mut sink) = tcp_transport(stream);

    // First frame is the session token.
    sink.send_frame(Bytes::from(token.into_bytes())).await?;
    println!("Connected.");
    println!("Type edits as: <index> <color 0-9>   e.g. `0 1` paints cell 0 green");
    println!("Type 'quit' or 'exit' to leave.\n");

    drain(&mut frames).await?;

    let stdin = io::stdin();
    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nEOF on stdin, exiting client.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            break;
        }

        let edit = match parse_edit(trimmed) {
            Ok(edit) => edit,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let mut payload = Vec::with_capacity(4);
        encode_client(&edit, &mut payload)?;
        sink.send_frame(Bytes::from(payload)).await?;

        // Give the server a tick to broadcast the change back.
        tokio::time::sleep(Duration::from_millis(150)).await;
        drain(&mut frames).await?;
    }

    sink.close().await?;
    Ok(())
}

fn parse_edit(line: &str) -> Result<ClientMessage> {
    let mut parts = line.split_whitespace();
    let index: usize = parts
        .next()
        .ok_or_else(|| anyhow!("missing cell index"))?
        .parse()?;
    let color: u8 = parts
        .next()
        .ok_or_else(|| anyhow!("missing color"))?
        .parse()?;

    Ok(ClientMessage::Edit {
        position: Position::from_index(index).ok_or_else(|| anyhow!("index out of range"))?,
        color: Color::from_u8(color).ok_or_else(|| anyhow!("color must be 0-9"))?,
    })
}

/// Print every frame that arrives before a short quiet period.
async fn drain(frames: &mut impl FrameSource) -> Result<()> {
    while let Ok(next) = timeout(Duration::from_millis(100), frames.next_frame()).await {
        let Some(frame) = next? else {
            println!("Server closed the connection.");
            std::process::exit(0);
        };
        match decode_server(&frame) {
            Ok(msg) => println!("<< {}", describe(&msg)),
            Err(e) => eprintln!("<< undecodable frame: {}", e),
        }
    }
    Ok(())
}

fn describe(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::State(snapshot) => {
            let painted = snapshot.cells.iter().filter(|c| **c != Color::White).count();
            format!(
                "STATE {}x{} ({} painted cells)",
                snapshot.width, snapshot.height, painted
            )
        }
        ServerMessage::StateMigration(changes) => {
            let cells: Vec<String> = changes
                .iter()
                .map(|(position, color)| format!("{}={:?}", position, color))
                .collect();
            format!("MIGRATION {}", cells.join(" "))
        }
        ServerMessage::PlayerState { cooldown_secs } => format!("COOLDOWN {}s", cooldown_secs),
        ServerMessage::PlayerCounter(count) => format!("PLAYERS {}", count),
    }
}
