use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::classify::AreaRecord;
use crate::detection::DetectorOutput;
use crate::error::{PerceptionError, Result};

/// Serializes an object to a pretty JSON file.
pub fn object_to_json<T: Serialize>(output_path: impl AsRef<Path>, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Reads a little-endian `f32` tensor dump of the given shape.
pub fn read_raw_tensor(path: impl AsRef<Path>, shape: [usize; 3]) -> Result<DetectorOutput> {
    let bytes = std::fs::read(path)?;
    let expected = shape.iter().product::<usize>() * 4;
    if bytes.len() != expected {
        return Err(PerceptionError::MalformedDetectorOutput {
            expected: format!("{} bytes for shape {:?}", expected, shape),
            actual: format!("{} bytes", bytes.len()),
        });
    }
    let data = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(DetectorOutput::new(shape, data))
}

/// Writes `output` as a little-endian `f32` dump readable by [`read_raw_tensor`].
pub fn write_raw_tensor(path: impl AsRef<Path>, output: &DetectorOutput) -> Result<()> {
    let bytes: Vec<u8> = output.data.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes)?;
    Ok(())
}

#[derive(serde::Serialize)]
struct AreaReport<'a> {
    area: usize,
    landmark: &'a str,
    landmark_count: u32,
    treasure: &'a str,
    treasure_count: u32,
    anchor: [f64; 3],
}

#[derive(serde::Serialize)]
struct SurveyReport<'a> {
    timestamp: u64,
    areas: Vec<AreaReport<'a>>,
}

/// Writes the per-area survey result as JSON, areas numbered from 1.
pub fn write_area_report(output_path: impl AsRef<Path>, areas: &[AreaRecord]) -> Result<()> {
    use std::time::SystemTime;

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let areas = areas
        .iter()
        .enumerate()
        .map(|(i, a)| AreaReport {
            area: i + 1,
            landmark: a.landmark.name(),
            landmark_count: a.landmark.count(),
            treasure: a.treasure.name(),
            treasure_count: a.treasure.count(),
            anchor: [a.anchor.x, a.anchor.y, a.anchor.z],
        })
        .collect();
    object_to_json(output_path, &SurveyReport { timestamp, areas })
}
