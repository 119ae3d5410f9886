//! Raw register to physical unit conversions.
//!
//! Pure functions, total over every 16-bit input. Drivers read registers
//! and hand the raw values here, so the numeric contracts can be tested
//! without a bus.

/// INA3221 bus-voltage resolution (mV per LSB, after the 3-bit shift).
pub const BUS_VOLTAGE_LSB_MV: i32 = 8;

/// INA3221 shunt-voltage resolution (µV per LSB).
pub const SHUNT_VOLTAGE_LSB_UV: i32 = 40;

/// Exchange the two bytes of a word.
///
/// SMBus delivers words low byte first; devices that send the most
/// significant byte first need their words swapped on the way in and out.
pub fn swap_bytes(raw: u16) -> u16 {
    ((raw << 8) & 0xFF00) | ((raw >> 8) & 0x00FF)
}

/// Interpret a 16-bit pattern as two's complement.
pub fn twos_complement(word: u16) -> i32 {
    if word & 0x8000 != 0 {
        word as i32 - 0x1_0000
    } else {
        word as i32
    }
}

/// Signed value of a big-endian register delivered in native order.
pub fn signed_from_wire(raw: u16) -> i32 {
    twos_complement(swap_bytes(raw))
}

/// Bus voltage in volts from a signed bus-voltage register value.
///
/// The low three bits are unused; the shift is arithmetic so negative
/// readings stay negative.
pub fn bus_voltage_v(signed: i32) -> f32 {
    let millivolts = (signed >> 3) * BUS_VOLTAGE_LSB_MV;
    millivolts as f32 / 1000.0
}

/// Shunt voltage in millivolts from a signed shunt-voltage register value.
pub fn shunt_voltage_mv(signed: i32) -> f32 {
    let microvolts = signed * SHUNT_VOLTAGE_LSB_UV;
    microvolts as f32 / 1000.0
}

/// Current in milliamps through a shunt of `shunt_ohms`.
pub fn current_ma(shunt_mv: f32, shunt_ohms: f32) -> f32 {
    shunt_mv / shunt_ohms
}

/// Join a low/high register pair into one word.
pub fn assemble_word(low: u8, high: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// HDC2010 temperature in °C.
pub fn temperature_c(raw: u16) -> f32 {
    (raw as f32 / 65536.0) * 165.0 - 40.0
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// HDC2010 relative humidity in percent.
pub fn humidity_percent(raw: u16) -> f32 {
    (raw as f32 / 65536.0) * 100.0
}
