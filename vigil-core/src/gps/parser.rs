// gps/parser.rs
use crate::gps::types::{GpsFix, GpsSensorError};
use heapless::{String, Vec};

/// Parses one NMEA sentence and updates `fix` if it carries a valid RMC fix.
///
/// Returns `Ok(true)` when a new valid fix was written, `Ok(false)` for
/// sentences we ignore (non-RMC, or RMC with a void status), and `Err` for
/// sentences that claim to be RMC but cannot be decoded. Callers count the
/// error and move on; nothing here is allowed to stop the sensor loop.
pub fn process_line(line: &[u8], fix: &mut GpsFix) -> Result<bool, GpsSensorError> {
    let Ok(sentence) = core::str::from_utf8(line) else {
        return Err(GpsSensorError::InvalidData);
    };

    // Drop a trailing checksum so it cannot contaminate the last field.
    let clean = sentence.split('*').next().unwrap_or("");
    let fields: Vec<&str, 20> = clean.split(',').take(20).collect();
    if fields.is_empty() || fields[0] != "$GPRMC" {
        return Ok(false);
    }
    if fields.len() < 7 {
        return Err(GpsSensorError::InvalidData);
    }

    // Field 2 is the receiver's own validity flag: A = valid, V = void.
    // A void sentence updates nothing, including the previous good fix.
    if fields[2] != "A" {
        return Ok(false);
    }

    let lat = parse_coordinate(fields[3], fields[4], 2).ok_or(GpsSensorError::InvalidData)?;
    let lon = parse_coordinate(fields[5], fields[6], 3).ok_or(GpsSensorError::InvalidData)?;

    fix.lat = lat;
    fix.lon = lon;
    fix.valid = true;
    fix.fix_time = String::try_from(fields[1]).unwrap_or_default();
    Ok(true)
}

/// Converts an NMEA `ddmm.mmmm` / `dddmm.mmmm` coordinate to signed decimal
/// degrees: `deg + min/60`, negated for the S and W hemispheres.
fn parse_coordinate(raw: &str, hemisphere: &str, deg_digits: usize) -> Option<f64> {
    // Coordinate fields are plain ASCII digits and a dot; a multi-byte
    // character in here is line corruption and must not reach the slice
    // below, which indexes by byte.
    if !raw.is_ascii() || raw.len() <= deg_digits {
        return None;
    }
    let degrees: f64 = raw[..deg_digits].parse().ok()?;
    let minutes: f64 = raw[deg_digits..].parse().ok()?;

    let value = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(value),
        "S" | "W" => Some(-value),
        _ => None,
    }
}
