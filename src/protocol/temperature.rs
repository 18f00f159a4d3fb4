use thiserror::Error;

/// Lowest setpoint the unit accepts, in °C.
pub const MIN_CELSIUS: f32 = 16.0;

/// Highest setpoint the unit accepts, in °C.
pub const MAX_CELSIUS: f32 = 31.0;

/// Fraction byte values for each quarter degree.
const FRACTIONS: [(u8, f32); 4] = [(0x0, 0.0), (0x4, 0.25), (0x8, 0.5), (0xc, 0.75)];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureError {
    #[error("unknown temperature fraction code {0:#04x}")]
    UnknownFraction(u8),
    #[error("setpoint codes ({whole:#04x}, {fraction:#04x}) fall outside the unit's range")]
    OutOfRange {
        whole: u8,
        fraction: u8
    },
}

pub fn in_range(celsius: f32) -> bool {
    (MIN_CELSIUS..=MAX_CELSIUS).contains(&celsius)
}

/// Round down to the nearest quarter degree.
pub fn quantize(celsius: f32) -> f32 {
    (celsius * 4.0).floor() / 4.0
}

/// Encode a setpoint as its (whole, fraction) byte pair.
///
/// The whole byte counts down from 31°C, the fraction byte holds the quarter
/// degree. Callers are expected to have checked `in_range` first.
pub fn encode(celsius: f32) -> (u8, u8) {
    let quantized = quantize(celsius);
    let whole = quantized.floor();

    let first = (MAX_CELSIUS - whole) as u8;

    let remainder = quantized - whole;
    let last = FRACTIONS
        .iter()
        .find(|(_, fraction)| *fraction == remainder)
        .map(|(code, _)| *code)
        .unwrap_or(0x0);

    (first, last)
}

/// Decode a (whole, fraction) byte pair. The result is always within
/// [MIN_CELSIUS]..=[MAX_CELSIUS].
pub fn decode(first: u8, last: u8) -> Result<f32, TemperatureError> {
    let fraction = FRACTIONS
        .iter()
        .find(|(code, _)| *code == last)
        .map(|(_, fraction)| *fraction)
        .ok_or(TemperatureError::UnknownFraction(last))?;

    let celsius = (MAX_CELSIUS - first as f32) + fraction;
    if !in_range(celsius) {
        return Err(TemperatureError::OutOfRange { whole: first, fraction: last });
    }

    Ok(celsius)
}

pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * (5.0 / 9.0)
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    (celsius * (9.0 / 5.0)) + 32.0
}


#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_steps() -> impl Iterator<Item = f32> {
        (0..=60).map(|step| MIN_CELSIUS + step as f32 * 0.25)
    }

    #[test]
    fn test_round_trip_every_quarter_degree() {
        for celsius in quarter_steps() {
            let (first, last) = encode(celsius);
            assert_eq!(decode(first, last), Ok(celsius), "{celsius}C encoded as {first:#x} {last:#x}");
        }
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(20.0), (0x0b, 0x0));
        assert_eq!(encode(16.0), (0x0f, 0x0));
        assert_eq!(encode(31.0), (0x00, 0x0));
        assert_eq!(encode(22.5), (0x09, 0x8));
        assert_eq!(encode(18.75), (0x0c, 0xc));
    }

    #[test]
    fn test_encode_quantizes_downward() {
        assert_eq!(encode(20.2), encode(20.0));
        assert_eq!(encode(20.49), encode(20.25));
        assert_eq!(encode(23.99), encode(23.75));
    }

    #[test]
    fn test_decode_unknown_fraction() {
        assert_eq!(decode(0x0b, 0x2), Err(TemperatureError::UnknownFraction(0x2)));
        assert_eq!(decode(0x0b, 0xff), Err(TemperatureError::UnknownFraction(0xff)));
    }

    #[test]
    fn test_decode_out_of_range() {
        // whole byte counts down from 31, so anything past 0x0f is below 16
        assert_eq!(decode(0x10, 0x0), Err(TemperatureError::OutOfRange { whole: 0x10, fraction: 0x0 }));
        assert_eq!(decode(0x20, 0x0), Err(TemperatureError::OutOfRange { whole: 0x20, fraction: 0x0 }));
        assert!(decode(0xff, 0x8).is_err());
        assert_eq!(decode(0x00, 0xc), Err(TemperatureError::OutOfRange { whole: 0x00, fraction: 0xc }));

        assert_eq!(decode(0x0f, 0x0), Ok(16.0));
        assert_eq!(decode(0x00, 0x0), Ok(31.0));
    }

    #[test]
    fn test_range() {
        assert!(in_range(16.0));
        assert!(in_range(31.0));
        assert!(!in_range(15.5));
        assert!(!in_range(31.5));
        assert!(!in_range(f32::NAN));
    }

    #[test]
    fn test_fahrenheit() {
        assert!((fahrenheit_to_celsius(68.0) - 20.0).abs() < 1e-4);
        assert!((celsius_to_fahrenheit(20.0) - 68.0).abs() < 1e-4);
        assert!((fahrenheit_to_celsius(celsius_to_fahrenheit(24.5)) - 24.5).abs() < 1e-4);
    }
}
