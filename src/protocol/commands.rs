use packed_struct::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use super::temperature::TemperatureError;


#[derive(PrimitiveEnum_u8, EnumIter, EnumString, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum SleepMode {
    #[default]
    Off = 0x0,
    Standard = 0x1,
    Aged = 0x2,
    Child = 0x3
}

#[derive(PrimitiveEnum_u8, EnumIter, EnumString, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    Heat = 0x1,
    Dehumidify = 0x2,
    Cool = 0x3,
    Fan = 0x7,
    #[default]
    Auto = 0x8
}

/// Fan speed.
///
/// Unlike the other settings, the speed is split over two body bytes: a class
/// in the top bits of byte 4 and a speed code in the low bits of byte 6
/// (see [FanSpeed::codes]).
#[derive(EnumIter, EnumString, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum FanSpeed {
    #[default]
    Auto,
    #[strum(serialize = "1")]
    Speed1,
    #[strum(serialize = "2")]
    Speed2,
    #[strum(serialize = "3")]
    Speed3,
    #[strum(serialize = "4")]
    Speed4,
    #[strum(serialize = "5")]
    Speed5,
    #[strum(serialize = "6")]
    Speed6,
    Mute
}

impl FanSpeed {
    /// `(class, code)` pair: class bits for byte 4, speed code for byte 6.
    pub fn codes(self) -> (u8, u8) {
        match self {
            FanSpeed::Auto => (0x00, 0x0),
            FanSpeed::Speed1 => (0x00, 0x2),
            FanSpeed::Speed2 => (0x00, 0x6),
            FanSpeed::Speed3 => (0x00, 0x3),
            FanSpeed::Speed4 => (0x00, 0x7),
            FanSpeed::Speed5 => (0x00, 0x5),
            FanSpeed::Speed6 => (0x40, 0x5),
            FanSpeed::Mute => (0x80, 0x2),
        }
    }

    pub fn from_codes(class: u8, code: u8) -> Option<Self> {
        use strum::IntoEnumIterator;

        FanSpeed::iter().find(|speed| speed.codes() == (class, code))
    }
}

/// Vertical vane position.
///
/// `*Flow` variants sweep continuously, `*Fix` variants hold a vane position.
#[derive(PrimitiveEnum_u8, EnumIter, EnumString, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum VerticalSwing {
    #[default]
    Auto = 0x00,
    UpDownFlow = 0x18,
    UpFlow = 0x10,
    DownFlow = 0x08,
    TopFix = 0x01,
    UpperFix = 0x02,
    MiddleFix = 0x03,
    AboveDownFix = 0x04,
    BottomFix = 0x05
}

impl VerticalSwing {
    pub fn is_flow(self) -> bool {
        matches!(self, VerticalSwing::UpDownFlow | VerticalSwing::UpFlow | VerticalSwing::DownFlow)
    }

    /// `self` if it agrees with the sweep bit, otherwise the nearest position that does.
    pub fn with_sweep(self, sweep: bool) -> Self {
        match (self.is_flow(), sweep) {
            (true, true) | (false, false) => self,
            (false, true) => VerticalSwing::UpDownFlow,
            (true, false) => VerticalSwing::Auto,
        }
    }
}

/// Horizontal vane position.
#[derive(PrimitiveEnum_u8, EnumIter, EnumString, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum HorizontalSwing {
    #[default]
    Auto = 0x00,
    LeftRightFlow = 0x08,
    LeftFlow = 0x10,
    MiddleFlow = 0x18,
    RightFlow = 0x20,
    LeftFix = 0x01,
    LeftMiddleFix = 0x02,
    MiddleFix = 0x03,
    RightMiddleFix = 0x04,
    RightFix = 0x05
}

impl HorizontalSwing {
    pub fn is_flow(self) -> bool {
        matches!(self,
            HorizontalSwing::LeftRightFlow | HorizontalSwing::LeftFlow |
            HorizontalSwing::MiddleFlow | HorizontalSwing::RightFlow)
    }

    pub fn with_sweep(self, sweep: bool) -> Self {
        match (self.is_flow(), sweep) {
            (true, true) | (false, false) => self,
            (false, true) => HorizontalSwing::LeftRightFlow,
            (true, false) => HorizontalSwing::Auto,
        }
    }
}


/// Complete desired state of the unit, lowered into one command frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandState {
    pub power: bool,
    pub display_on: bool,
    pub buzzer_on: bool,
    pub eco: bool,
    /// 8°C frost protection heating
    pub heater_8deg: bool,
    pub health_on: bool,

    pub sleep_mode: SleepMode,
    pub mode: Mode,

    /// Setpoint in °C, 16 to 31 in quarter degree steps.
    pub target_temp_c: f32,

    pub fan_speed: FanSpeed,
    pub swing_vertical: VerticalSwing,
    pub swing_horizontal: HorizontalSwing,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            power: false,
            display_on: false,
            buzzer_on: false,
            eco: false,
            heater_8deg: false,
            health_on: false,
            sleep_mode: SleepMode::Off,
            mode: Mode::Auto,
            target_temp_c: 24.0,
            fan_speed: FanSpeed::Auto,
            swing_vertical: VerticalSwing::Auto,
            swing_horizontal: HorizontalSwing::Auto,
        }
    }
}


/// A partial change to the unit's state. `None` fields are left as they are.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlRequest {
    pub power: Option<bool>,
    pub display_on: Option<bool>,
    pub buzzer_on: Option<bool>,
    pub eco: Option<bool>,
    pub heater_8deg: Option<bool>,
    pub health_on: Option<bool>,
    pub sleep_mode: Option<SleepMode>,
    pub mode: Option<Mode>,
    pub target_temp_c: Option<f32>,
    pub fan_speed: Option<FanSpeed>,
    pub swing_vertical: Option<VerticalSwing>,
    pub swing_horizontal: Option<HorizontalSwing>,
}

impl ControlRequest {
    pub fn is_empty(&self) -> bool {
        *self == ControlRequest::default()
    }

    /// Build a new state from `base` with this request's fields applied.
    pub fn apply(&self, base: &CommandState) -> CommandState {
        CommandState {
            power: self.power.unwrap_or(base.power),
            display_on: self.display_on.unwrap_or(base.display_on),
            buzzer_on: self.buzzer_on.unwrap_or(base.buzzer_on),
            eco: self.eco.unwrap_or(base.eco),
            heater_8deg: self.heater_8deg.unwrap_or(base.heater_8deg),
            health_on: self.health_on.unwrap_or(base.health_on),
            sleep_mode: self.sleep_mode.unwrap_or(base.sleep_mode),
            mode: self.mode.unwrap_or(base.mode),
            target_temp_c: self.target_temp_c.unwrap_or(base.target_temp_c),
            fan_speed: self.fan_speed.unwrap_or(base.fan_speed),
            swing_vertical: self.swing_vertical.unwrap_or(base.swing_vertical),
            swing_horizontal: self.swing_horizontal.unwrap_or(base.swing_horizontal),
        }
    }
}


#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown {field} code {code:#04x}")]
    UnknownCode {
        field: &'static str,
        code: u8
    },
    #[error("unknown fan speed codes (class: {class:#04x}, speed: {code:#04x})")]
    UnknownFanCodes {
        class: u8,
        code: u8
    },
    #[error("{field} is not carried by a {len} byte body")]
    NotPresent {
        field: &'static str,
        len: usize
    },
    #[error("invalid target temperature: {0}")]
    Temperature(#[from] TemperatureError),
}

/// State decoded from a status frame.
///
/// Flags are single bits and always decode. Coded fields decode independently
/// of each other so one unknown code doesn't lose the rest of the frame.
///
/// The sweep bits are all a 24 byte body says about swing: whether each vane
/// is sweeping, not which position code it holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedState {
    pub power: bool,
    pub display_on: bool,
    pub buzzer_on: bool,
    pub eco: bool,
    pub heater_8deg: bool,
    pub health_on: bool,
    pub sleep_mode: SleepMode,
    pub vertical_sweep: bool,
    pub horizontal_sweep: bool,

    pub mode: Result<Mode, FieldError>,
    pub target_temp_c: Result<f32, FieldError>,
    pub fan_speed: Result<FanSpeed, FieldError>,
    pub swing_vertical: Result<VerticalSwing, FieldError>,
    pub swing_horizontal: Result<HorizontalSwing, FieldError>,
}

impl DecodedState {
    /// Decoded fields layered over `base`; fields that failed to decode keep `base`'s value.
    ///
    /// A swing without its position code keeps `base`'s position only while
    /// that position agrees with the sweep bit.
    pub fn merge_onto(&self, base: &CommandState) -> CommandState {
        CommandState {
            power: self.power,
            display_on: self.display_on,
            buzzer_on: self.buzzer_on,
            eco: self.eco,
            heater_8deg: self.heater_8deg,
            health_on: self.health_on,
            sleep_mode: self.sleep_mode,
            mode: self.mode.unwrap_or(base.mode),
            target_temp_c: self.target_temp_c.unwrap_or(base.target_temp_c),
            fan_speed: self.fan_speed.unwrap_or(base.fan_speed),
            swing_vertical: self.swing_vertical
                .unwrap_or_else(|_| base.swing_vertical.with_sweep(self.vertical_sweep)),
            swing_horizontal: self.swing_horizontal
                .unwrap_or_else(|_| base.swing_horizontal.with_sweep(self.horizontal_sweep)),
        }
    }

    pub fn errors(&self) -> Vec<FieldError> {
        [
            self.mode.err(),
            self.target_temp_c.err(),
            self.fan_speed.err(),
            self.swing_vertical.err(),
            self.swing_horizontal.err(),
        ].into_iter().flatten().collect()
    }

    /// The fully decoded state, or the first field that failed.
    pub fn complete(&self) -> Result<CommandState, FieldError> {
        Ok(CommandState {
            power: self.power,
            display_on: self.display_on,
            buzzer_on: self.buzzer_on,
            eco: self.eco,
            heater_8deg: self.heater_8deg,
            health_on: self.health_on,
            sleep_mode: self.sleep_mode,
            mode: self.mode?,
            target_temp_c: self.target_temp_c?,
            fan_speed: self.fan_speed?,
            swing_vertical: self.swing_vertical?,
            swing_horizontal: self.swing_horizontal?,
        })
    }
}


#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_fan_codes_unique() {
        for speed in FanSpeed::iter() {
            let (class, code) = speed.codes();
            assert_eq!(FanSpeed::from_codes(class, code), Some(speed));
        }

        assert_eq!(FanSpeed::from_codes(0x00, 0x1), None);
        assert_eq!(FanSpeed::from_codes(0xc0, 0x2), None);
    }

    #[test]
    fn test_primitive_codes_invert() {
        for mode in Mode::iter() {
            assert_eq!(Mode::from_primitive(mode.to_primitive()), Some(mode));
        }
        for swing in VerticalSwing::iter() {
            assert_eq!(VerticalSwing::from_primitive(swing.to_primitive()), Some(swing));
        }
        for swing in HorizontalSwing::iter() {
            assert_eq!(HorizontalSwing::from_primitive(swing.to_primitive()), Some(swing));
        }

        assert_eq!(Mode::from_primitive(0x4), None);
        assert_eq!(VerticalSwing::from_primitive(0x06), None);
        assert_eq!(HorizontalSwing::from_primitive(0x28), None);
    }

    #[test]
    fn test_flow_variants() {
        let flows: Vec<_> = VerticalSwing::iter().filter(|swing| swing.is_flow()).collect();
        assert_eq!(flows, [VerticalSwing::UpDownFlow, VerticalSwing::UpFlow, VerticalSwing::DownFlow]);

        assert_eq!(HorizontalSwing::iter().filter(|swing| swing.is_flow()).count(), 4);
        assert!(!HorizontalSwing::Auto.is_flow());
    }

    #[test]
    fn test_with_sweep() {
        assert_eq!(VerticalSwing::UpFlow.with_sweep(true), VerticalSwing::UpFlow);
        assert_eq!(VerticalSwing::TopFix.with_sweep(false), VerticalSwing::TopFix);
        assert_eq!(VerticalSwing::TopFix.with_sweep(true), VerticalSwing::UpDownFlow);
        assert_eq!(VerticalSwing::DownFlow.with_sweep(false), VerticalSwing::Auto);

        assert_eq!(HorizontalSwing::RightFlow.with_sweep(true), HorizontalSwing::RightFlow);
        assert_eq!(HorizontalSwing::Auto.with_sweep(true), HorizontalSwing::LeftRightFlow);
        assert_eq!(HorizontalSwing::MiddleFlow.with_sweep(false), HorizontalSwing::Auto);
    }

    #[test]
    fn test_merge_follows_sweep_bits_without_codes() {
        let base = CommandState {
            swing_vertical: VerticalSwing::MiddleFix,
            swing_horizontal: HorizontalSwing::LeftFlow,
            ..Default::default()
        };

        let decoded = DecodedState {
            power: true,
            display_on: false,
            buzzer_on: false,
            eco: false,
            heater_8deg: false,
            health_on: false,
            sleep_mode: SleepMode::Off,
            vertical_sweep: true,
            horizontal_sweep: true,
            mode: Ok(Mode::Cool),
            target_temp_c: Ok(24.0),
            fan_speed: Ok(FanSpeed::Auto),
            swing_vertical: Err(FieldError::NotPresent { field: "vertical swing", len: 24 }),
            swing_horizontal: Err(FieldError::NotPresent { field: "horizontal swing", len: 24 }),
        };

        let merged = decoded.merge_onto(&base);
        assert_eq!(merged.swing_vertical, VerticalSwing::UpDownFlow);
        assert_eq!(merged.swing_horizontal, HorizontalSwing::LeftFlow);

        let stopped = DecodedState { vertical_sweep: false, horizontal_sweep: false, ..decoded };
        let merged = stopped.merge_onto(&base);
        assert_eq!(merged.swing_vertical, VerticalSwing::MiddleFix);
        assert_eq!(merged.swing_horizontal, HorizontalSwing::Auto);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("dehumidify".parse::<Mode>(), Ok(Mode::Dehumidify));
        assert_eq!("mute".parse::<FanSpeed>(), Ok(FanSpeed::Mute));
        assert_eq!("3".parse::<FanSpeed>(), Ok(FanSpeed::Speed3));
        assert_eq!("above-down-fix".parse::<VerticalSwing>(), Ok(VerticalSwing::AboveDownFix));
        assert!("turbo".parse::<FanSpeed>().is_err());
        assert_eq!(HorizontalSwing::LeftMiddleFix.to_string(), "left-middle-fix");
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let base = CommandState {
            power: true,
            mode: Mode::Cool,
            fan_speed: FanSpeed::Speed4,
            swing_vertical: VerticalSwing::UpFlow,
            ..Default::default()
        };

        let request = ControlRequest {
            target_temp_c: Some(21.5),
            ..Default::default()
        };

        let next = request.apply(&base);
        assert_eq!(next, CommandState { target_temp_c: 21.5, ..base });
        assert!(ControlRequest::default().is_empty());
        assert!(!request.is_empty());
    }

    #[test]
    fn test_merge_keeps_base_for_failed_fields() {
        let base = CommandState {
            mode: Mode::Heat,
            swing_horizontal: HorizontalSwing::RightFix,
            ..Default::default()
        };

        let decoded = DecodedState {
            power: true,
            display_on: true,
            buzzer_on: false,
            eco: false,
            heater_8deg: false,
            health_on: false,
            sleep_mode: SleepMode::Child,
            vertical_sweep: false,
            horizontal_sweep: false,
            mode: Err(FieldError::UnknownCode { field: "mode", code: 0x4 }),
            target_temp_c: Ok(19.25),
            fan_speed: Ok(FanSpeed::Mute),
            swing_vertical: Ok(VerticalSwing::BottomFix),
            swing_horizontal: Err(FieldError::NotPresent { field: "horizontal swing", len: 24 }),
        };

        let merged = decoded.merge_onto(&base);
        assert_eq!(merged.mode, Mode::Heat);
        assert_eq!(merged.swing_horizontal, HorizontalSwing::RightFix);
        assert_eq!(merged.target_temp_c, 19.25);
        assert_eq!(merged.sleep_mode, SleepMode::Child);
        assert!(merged.power);

        assert_eq!(decoded.errors().len(), 2);
        assert_eq!(decoded.complete(), Err(FieldError::UnknownCode { field: "mode", code: 0x4 }));
    }
}
