use std::time::SystemTime;

use anyhow::Result;

use clap::Parser;
use colored::{Colorize, ColoredString};
use futures::StreamExt;
use pioneerhvac::{config::Port, protocol::{commands::DecodedState, decoder::RxFrame, layout}};
use url::Url;


/// Print every frame seen on a port.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the port to connect to
    ///
    /// either serial:///device/path or tcp+raw://host:port URLs supported
    port: Url,

    /// Body length of the status frames the unit sends
    #[arg(long, default_value_t = layout::COMMAND_BODY_LEN)]
    status_body_len: usize,
}


fn delta_ms(time: Option<SystemTime>) -> u128 {
    time.and_then(|time| time.elapsed().ok())
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}

fn field<T: std::fmt::Display, E: std::fmt::Display>(value: &Result<T, E>) -> String {
    match value {
        Ok(value) => value.to_string(),
        Err(err) => format!("<{err}>"),
    }
}

fn state_desc(state: &DecodedState) -> String {
    let power = if state.power { "on" } else { "off" };

    format!(
        "power {power} mode {} temp {} fan {} swing {}/{} sweep {}/{} sleep {} display {} buzzer {} eco {} heater {} health {}",
        field(&state.mode),
        field(&state.target_temp_c),
        field(&state.fan_speed),
        field(&state.swing_vertical),
        field(&state.swing_horizontal),
        state.vertical_sweep,
        state.horizontal_sweep,
        state.sleep_mode,
        state.display_on,
        state.buzzer_on,
        state.eco,
        state.heater_8deg,
        state.health_on,
    )
}

fn coloured(frame: &RxFrame, line: String) -> ColoredString {
    match frame {
        RxFrame::Status(_) => line.on_green().bright_white(),
        RxFrame::Informational { .. } => line.on_cyan().bright_white(),
        RxFrame::Corrupted(_) => line.on_red().bright_white(),
    }
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut framed = Port::open(&args.port).await?.framed(args.status_body_len);

    let start_time = SystemTime::now();
    let mut last_frame_time: Option<SystemTime> = None;

    while let Some(frame) = framed.next().await {
        let frame = frame?;

        let start_delta_ms = delta_ms(Some(start_time));
        let last_frame_delta_ms = delta_ms(last_frame_time);

        let desc = match &frame {
            RxFrame::Status(status) => format!("status: {}  {:02x?}", state_desc(&status.state), status.raw),
            RxFrame::Informational { family, payload } => format!("info {family:02x}: {payload:02x?}"),
            RxFrame::Corrupted(data) => format!("corrupted: {data:02x?}"),
        };

        let line = format!("[{start_delta_ms:8}, {last_frame_delta_ms:8}] {desc}");

        println!("{}", coloured(&frame, line));

        last_frame_time = Some(SystemTime::now());
    }

    Ok(())
}
