//! Decoder for the encoded polyline format returned by the routing service
//! (precision 5, latitude before longitude).

use anyhow::{Result, anyhow};

use crate::models::{Coordinate, Path};

const PRECISION: f64 = 1e5;

/// Decode an encoded polyline string into an ordered path
pub fn decode(encoded: &str) -> Result<Path> {
    let bytes = encoded.as_bytes();
    let mut path = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lon += next_delta(bytes, &mut index)?;

        let coordinate = Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION);
        if !coordinate.is_valid() {
            return Err(anyhow!(
                "Decoded coordinate out of range at byte {index}: {}",
                coordinate.format_coordinates()
            ));
        }
        path.push(coordinate);
    }

    Ok(path)
}

/// Read one zig-zag encoded varint starting at `index`
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| anyhow!("Polyline ended in the middle of a value"))?;
        *index += 1;

        let chunk = i64::from(byte)
            .checked_sub(63)
            .filter(|c| (0..64).contains(c))
            .ok_or_else(|| anyhow!("Invalid polyline character {:?}", byte as char))?;

        if shift > 60 {
            return Err(anyhow!("Polyline value too long"));
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &Coordinate, lat: f64, lon: f64) {
        assert!(
            (actual.latitude - lat).abs() < 1e-5 && (actual.longitude - lon).abs() < 1e-5,
            "expected ({lat}, {lon}), got {}",
            actual.format_coordinates()
        );
    }

    #[test]
    fn test_decode_reference_polyline() {
        // Reference example from the format documentation
        let path = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(path.len(), 3);
        assert_close(&path[0], 38.5, -120.2);
        assert_close(&path[1], 40.7, -120.95);
        assert_close(&path[2], 43.252, -126.453);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated_input() {
        // Second value of the pair is missing
        assert!(decode("_p~iF").is_err());
    }

    #[test]
    fn test_decode_invalid_character() {
        assert!(decode("_p~iF ps|U").is_err());
    }
}
