use std::time::Duration;

use anyhow::{Result, Context};
use clap::Parser;
use pioneerhvac::{
    config,
    controller::ProtocolController,
    protocol::{commands::*, decoder::FrameDecoder, layout, messages, temperature},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;


/// Control a Pioneer split air conditioner over its UART link and report
/// the state it sends back.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the port to connect to
    ///
    /// either serial:///device/path or tcp+raw://host:port URLs supported
    port: Url,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Body length of the status frames the unit sends
    #[arg(long, default_value_t = layout::COMMAND_BODY_LEN)]
    status_body_len: usize,

    /// Informational message (1-4) to send before every poll
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    query: Option<u8>,

    /// Polls to wait for a status report before sending the control request
    #[arg(long, default_value_t = 4)]
    wait_polls: u64,

    /// Exit after this many polls
    #[arg(long)]
    polls: Option<u64>,

    #[command(flatten)]
    control: ControlArgs,
}

/// Settings to change. Anything left out keeps its current value.
#[derive(clap::Args, Debug)]
struct ControlArgs {
    #[arg(long)]
    power: Option<bool>,

    /// heat, dehumidify, cool, fan or auto
    #[arg(long)]
    mode: Option<Mode>,

    /// Target temperature in °C (16 to 31)
    #[arg(long, conflicts_with = "temp_f")]
    temp: Option<f32>,

    /// Target temperature in °F
    #[arg(long)]
    temp_f: Option<f32>,

    /// auto, 1 to 6 or mute
    #[arg(long)]
    fan: Option<FanSpeed>,

    #[arg(long)]
    swing_vertical: Option<VerticalSwing>,

    #[arg(long)]
    swing_horizontal: Option<HorizontalSwing>,

    /// off, standard, aged or child
    #[arg(long)]
    sleep: Option<SleepMode>,

    #[arg(long)]
    display: Option<bool>,

    #[arg(long)]
    buzzer: Option<bool>,

    #[arg(long)]
    eco: Option<bool>,

    /// 8°C frost protection heating
    #[arg(long)]
    heater_8deg: Option<bool>,

    #[arg(long)]
    health: Option<bool>,
}

impl ControlArgs {
    fn request(&self) -> ControlRequest {
        ControlRequest {
            power: self.power,
            display_on: self.display,
            buzzer_on: self.buzzer,
            eco: self.eco,
            heater_8deg: self.heater_8deg,
            health_on: self.health,
            sleep_mode: self.sleep,
            mode: self.mode,
            target_temp_c: self.temp.or(self.temp_f.map(temperature::fahrenheit_to_celsius)),
            fan_speed: self.fan,
            swing_vertical: self.swing_vertical,
            swing_horizontal: self.swing_horizontal,
        }
    }
}

fn describe(state: &CommandState) -> String {
    let power = if state.power { "on" } else { "off" };

    format!(
        "power {power}, {mode} {temp}°C ({fahrenheit:.1}°F), fan {fan}, swing {vertical}/{horizontal}, \
         sleep {sleep}, display {display}, buzzer {buzzer}, eco {eco}, 8° heater {heater}, health {health}",
        mode = state.mode,
        temp = state.target_temp_c,
        fahrenheit = temperature::celsius_to_fahrenheit(state.target_temp_c),
        fan = state.fan_speed,
        vertical = state.swing_vertical,
        horizontal = state.swing_horizontal,
        sleep = state.sleep_mode,
        display = state.display_on,
        buzzer = state.buzzer_on,
        eco = state.eco,
        heater = state.heater_8deg,
        health = state.health_on,
    )
}


#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let transport = config::open_transport(&args.port)?;
    let decoder = FrameDecoder::with_status_body_len(args.status_body_len);
    let mut controller = ProtocolController::with_decoder(transport, CommandState::default(), decoder);

    info!("connected to {}", args.port);

    let query = args.query
        .map(|n| messages::info_message(n as usize).context("no such informational message"))
        .transpose()?;

    let request = args.control.request();
    let mut pending = (!request.is_empty()).then_some(request);

    let mut interval = tokio::time::interval(Duration::from_millis(args.poll_ms));
    let mut polls = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {},
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        if let Some(query) = query {
            controller.send_raw(query)?;
        }

        if let Some(state) = controller.poll()? {
            println!("unit: {}", describe(&state));
        }

        polls += 1;

        // wait for the unit to report so the request layers over its actual state
        if let Some(request) = pending {
            if controller.observed().is_some() || polls >= args.wait_polls {
                if controller.observed().is_none() {
                    warn!("no status from the unit, applying request over defaults");
                }

                let sent = controller.control(&request)?;
                println!("sent: {}", describe(&sent));

                pending = None;
            }
        }

        if args.polls.is_some_and(|max| polls >= max) {
            break;
        }
    }

    if controller.checksum_errors() > 0 {
        warn!("{} frames discarded with invalid checksums", controller.checksum_errors());
    }

    Ok(())
}
