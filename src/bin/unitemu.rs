use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use futures::{SinkExt, TryStreamExt};
use pioneerhvac::{
    config::{Port, PortStream},
    protocol::{codec::TxFrame, commands::*, decoder::RxFrame, encoder, layout},
};
use rand::Rng;
use tokio::time::sleep;
use url::Url;

/// Emulator for a Pioneer indoor unit
///
/// Applies every command frame it receives and answers each frame with a
/// status report, so the host tools can be exercised without hardware.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the port to connect to
    ///
    /// either serial:///device/path or tcp+raw://host:port URLs supported
    port: Url,

    /// Body length of the status frames to send
    #[arg(long, default_value_t = layout::COMMAND_BODY_LEN)]
    status_body_len: usize,

    /// Probability (0 to 1) of corrupting a reply
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Maximum random delay before replying, in milliseconds
    #[arg(long, default_value_t = 50)]
    max_delay_ms: u64,
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // commands from the host always carry a command sized body
    let framed = Port::open(&args.port).await?.framed(layout::COMMAND_BODY_LEN);

    unit_emulator(&args, framed).await
}


/// Flip one bit of an encoded status and prepend some line noise.
fn corrupt(state: &CommandState, body_len: usize) -> Result<Bytes> {
    let mut rng = rand::thread_rng();

    let mut bytes: Vec<u8> = (0..rng.gen_range(0..4)).map(|_| rng.gen()).collect();
    let frame_start = bytes.len();

    bytes.extend(encoder::encode_with_body_len(state, body_len)?);

    let index = rng.gen_range(frame_start..bytes.len());
    bytes[index] ^= 1 << rng.gen_range(0..8);

    Ok(bytes.into())
}

async fn unit_emulator(args: &Args, mut port: Box<dyn PortStream>) -> Result<()> {
    println!("Starting unit emulator on {}", args.port);

    let mut state = CommandState {
        display_on: true,
        buzzer_on: true,
        mode: Mode::Cool,
        target_temp_c: 24.0,
        ..Default::default()
    };

    loop {
        let frame = if let Some(frame) = port.try_next().await? { frame } else {
            // stream reached the end
            return Ok(())
        };

        match frame {
            RxFrame::Status(command) => {
                for err in command.state.errors() {
                    if !matches!(err, FieldError::NotPresent { .. }) {
                        println!("command field ignored: {err}");
                    }
                }

                state = command.state.merge_onto(&state);
                println!("command applied: {state:?}");
            },
            RxFrame::Informational { family, payload } => {
                println!("query {family:02x}: {payload:02x?}");
            },
            RxFrame::Corrupted(data) => {
                println!("corrupted command, not answering: {data:02x?}");
                continue;
            },
        }

        if args.max_delay_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=args.max_delay_ms);
            sleep(Duration::from_millis(delay)).await;
        }

        let resp = if args.noise > 0.0 && rand::thread_rng().gen_bool(args.noise.min(1.0)) {
            TxFrame::Raw(corrupt(&state, args.status_body_len)?)
        } else {
            TxFrame::State { state, body_len: args.status_body_len }
        };

        port.send(resp).await?;
    }
}
