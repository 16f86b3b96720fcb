use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Deserialize;

const DEFAULT_REGIONS_FILE: &str = "parking_regions.json";
const DEFAULT_API_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_MODEL_INPUT_WIDTH: u32 = 640;
const DEFAULT_MODEL_INPUT_HEIGHT: u32 = 640;

#[derive(Debug, Deserialize, Default)]
struct LotwatchConfigFile {
    regions_file: Option<String>,
    backend_url: Option<String>,
    api: Option<ApiConfigFile>,
    detector: Option<DetectorConfigFile>,
    classifier: Option<ClassifierConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    confidence_threshold: Option<f32>,
    vehicle_classes: Option<Vec<u32>>,
}

/// Resolved service configuration: file values overridden by environment,
/// then validated.
#[derive(Debug, Clone)]
pub struct LotwatchConfig {
    pub regions_file: String,
    /// Backend slot store base URL; `None` keeps occupancy local.
    pub backend_url: Option<String>,
    pub api_addr: String,
    pub detector: DetectorSettings,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub confidence_threshold: f32,
    pub vehicle_classes: Vec<u32>,
}

impl LotwatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LOTWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LotwatchConfigFile) -> Self {
        let regions_file = file
            .regions_file
            .unwrap_or_else(|| DEFAULT_REGIONS_FILE.to_string());
        let api_addr = file
            .api
            .as_ref()
            .and_then(|api| api.addr.clone())
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            model_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_path.clone()),
            input_width: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_width)
                .unwrap_or(DEFAULT_MODEL_INPUT_WIDTH),
            input_height: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_height)
                .unwrap_or(DEFAULT_MODEL_INPUT_HEIGHT),
        };
        let classifier = ClassifierSettings {
            confidence_threshold: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            vehicle_classes: file
                .classifier
                .and_then(|classifier| classifier.vehicle_classes)
                .unwrap_or_else(|| crate::detect::VEHICLE_CLASS_IDS.to_vec()),
        };
        Self {
            regions_file,
            backend_url: file.backend_url,
            api_addr,
            detector,
            classifier,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("LOTWATCH_REGIONS_FILE") {
            if !path.trim().is_empty() {
                self.regions_file = path;
            }
        }
        if let Ok(url) = std::env::var("LOTWATCH_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend_url = Some(url);
            }
        }
        if let Ok(addr) = std::env::var("LOTWATCH_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(backend) = std::env::var("LOTWATCH_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("LOTWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(threshold) = std::env::var("LOTWATCH_CONFIDENCE_THRESHOLD") {
            self.classifier.confidence_threshold = threshold.parse().map_err(|_| {
                anyhow!("LOTWATCH_CONFIDENCE_THRESHOLD must be a number in [0, 1]")
            })?;
        }
        if let Ok(classes) = std::env::var("LOTWATCH_VEHICLE_CLASSES") {
            let parsed = parse_class_list(&classes)?;
            if !parsed.is_empty() {
                self.classifier.vehicle_classes = parsed;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.classifier.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold {} outside [0, 1]",
                self.classifier.confidence_threshold
            ));
        }
        if self.classifier.vehicle_classes.is_empty() {
            return Err(anyhow!("vehicle class allow-list must not be empty"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input dimensions must be non-zero"));
        }
        if self.regions_file.trim().is_empty() {
            return Err(anyhow!("regions file path must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LotwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| anyhow!("failed to read config file {}: {}", path.display(), err))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|err| anyhow!("invalid config file {}: {}", path.display(), err))?;
    Ok(cfg)
}

fn parse_class_list(value: &str) -> Result<Vec<u32>> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<u32>()
                .map_err(|_| anyhow!("invalid class id '{}' in LOTWATCH_VEHICLE_CLASSES", entry))
        })
        .collect()
}
