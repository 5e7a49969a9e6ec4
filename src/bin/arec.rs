use std::path::{Path, PathBuf};
use std::time::Instant;

use area_recognition::camera_model::Undistorter;
use area_recognition::classify::classify_items;
use area_recognition::config::{CameraCalibration, PerceptionConfig};
use area_recognition::detection::{
    DetectorOutput, NeuralDetector, TensorFileDetector, decode_detections,
};
use area_recognition::io::{object_from_json, object_to_json, read_raw_tensor};
use area_recognition::marker::ArucoMarkerDetector;
use area_recognition::nms::non_max_suppression;
use area_recognition::pipeline::{DirectorySnapshotSink, PerceptionPipeline};
use area_recognition::{ItemInfo, PerceptionError, Pose, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use image::{GrayImage, ImageReader};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Parser)]
#[command(version, about, author)]
struct ArecCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rectify the area next to a marker and print its anchor pose
    Rectify {
        /// path to a frame
        image: PathBuf,

        /// camera calibration json
        #[arg(short, long)]
        calibration: PathBuf,

        /// marker id in the configured dictionary
        #[arg(short, long)]
        marker_id: u32,

        /// raw detector tensor of the rectified area, classified when given
        #[arg(long, requires = "anchors")]
        tensor: Option<PathBuf>,

        #[arg(long)]
        anchors: Option<usize>,

        /// snapshot folder
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// perception config json
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Decode a raw detector tensor and print the area items
    Classify {
        /// little-endian f32 dump shaped [1, 4 + labels, anchors]
        tensor: PathBuf,

        #[arg(short, long, default_value_t = 8400)]
        anchors: usize,

        /// perception config json
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Rectify every png/jpg frame in a folder
    Batch {
        /// path to image folder
        path: PathBuf,

        /// camera calibration json
        #[arg(short, long)]
        calibration: PathBuf,

        /// marker id in the configured dictionary
        #[arg(short, long)]
        marker_id: u32,

        /// output folder for snapshots and poses.json
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// perception config json
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Stands in when no detector tensor is available: every area is empty.
struct NoDetections {
    num_labels: usize,
}

impl NeuralDetector for NoDetections {
    fn infer(&self, _image: &GrayImage) -> Result<DetectorOutput> {
        Ok(DetectorOutput::new([1, 4 + self.num_labels, 0], Vec::new()))
    }
}

#[derive(Serialize)]
struct AreaItems {
    landmark: ItemInfo,
    treasure: ItemInfo,
}

#[derive(Serialize)]
struct FramePose {
    frame: String,
    found: bool,
    anchor: Option<Pose>,
    error: Option<String>,
}

fn load_config(path: Option<&Path>) -> Result<PerceptionConfig> {
    let config = match path {
        Some(p) => object_from_json(p)?,
        None => PerceptionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn build_pipeline(
    config: PerceptionConfig,
    calibration: &CameraCalibration,
    frame_size: (u32, u32),
    neural_detector: Box<dyn NeuralDetector + Send + Sync>,
    output: Option<&Path>,
) -> Result<PerceptionPipeline> {
    let undistorter = Undistorter::new(calibration, frame_size.0, frame_size.1);
    let marker_detector = ArucoMarkerDetector::new(&config.marker_dictionary)?;
    let mut pipeline = PerceptionPipeline::new(
        config,
        calibration.na_camera_matrix(),
        Box::new(marker_detector),
        neural_detector,
    )?
    .with_undistorter(undistorter);
    if let Some(dir) = output {
        pipeline = pipeline.with_snapshot_sink(Box::new(DirectorySnapshotSink::new(dir)));
    }
    Ok(pipeline)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = ArecCli::parse();
    match cli.command {
        Command::Rectify {
            image,
            calibration,
            marker_id,
            tensor,
            anchors,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let calibration: CameraCalibration = object_from_json(&calibration)?;
            let num_labels = config.labels.len();
            let neural_detector: Box<dyn NeuralDetector + Send + Sync> = match (tensor, anchors) {
                (Some(t), Some(n)) => Box::new(TensorFileDetector::new(t, [1, 4 + num_labels, n])),
                _ => Box::new(NoDetections { num_labels }),
            };
            let frame = ImageReader::open(&image)?.decode()?;
            let pipeline = build_pipeline(
                config,
                &calibration,
                (frame.width(), frame.height()),
                neural_detector,
                output.as_deref(),
            )?;
            let record = pipeline.recognize_area(&frame, marker_id)?;
            print_json(&record)?;
        }
        Command::Classify {
            tensor,
            anchors,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let labels = config.label_set();
            let output = read_raw_tensor(&tensor, [1, 4 + labels.len(), anchors])?;
            let raw = decode_detections(&output, labels.len(), config.confidence_threshold)?;
            let kept = non_max_suppression(&raw, config.iou_threshold);
            let (landmark, treasure) = classify_items(&kept, &labels);
            print_json(&AreaItems { landmark, treasure })?;
        }
        Command::Batch {
            path,
            calibration,
            marker_id,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let calibration: CameraCalibration = object_from_json(&calibration)?;
            let pattern = format!("{}/*", path.display());
            let img_paths =
                glob(&pattern).map_err(|e| PerceptionError::Config(e.to_string()))?;
            let mut sorted_path: Vec<PathBuf> = img_paths.filter_map(img_filter).collect();
            sorted_path.sort();
            let Some(first) = sorted_path.first() else {
                log::warn!("no png/jpg frames under {}", path.display());
                return Ok(());
            };
            let frame_size = image::image_dimensions(first)?;
            let num_labels = config.labels.len();
            let pipeline = build_pipeline(
                config,
                &calibration,
                frame_size,
                Box::new(NoDetections { num_labels }),
                Some(&output),
            )?;

            let now = Instant::now();
            let poses: Vec<FramePose> = sorted_path
                .par_iter()
                .progress_count(sorted_path.len() as u64)
                .map(|p| {
                    let frame = p
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let result = ImageReader::open(p)
                        .map_err(PerceptionError::from)
                        .and_then(|r| r.decode().map_err(PerceptionError::from))
                        .and_then(|img| {
                            pipeline.preprocess(&img, marker_id, &format!("_{}", frame))
                        });
                    match result {
                        Ok(pre) => FramePose {
                            frame,
                            found: pre.found,
                            anchor: pre.found.then_some(pre.anchor),
                            error: None,
                        },
                        Err(e) => {
                            log::warn!("{}: {}", p.display(), e);
                            FramePose {
                                frame,
                                found: false,
                                anchor: None,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                })
                .collect();
            let duration_sec = now.elapsed().as_secs_f64();
            println!("rectifying took {:.6} sec", duration_sec);
            println!("avg: {} sec", duration_sec / poses.len() as f64);
            println!(
                "marker {} found in {} of {} frames",
                marker_id,
                poses.iter().filter(|p| p.found).count(),
                poses.len()
            );
            std::fs::create_dir_all(&output)?;
            object_to_json(output.join("poses.json"), &poses)?;
        }
    }
    Ok(())
}
