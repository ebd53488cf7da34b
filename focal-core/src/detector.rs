use std::path::Path;

use anyhow::{Context, Result};
use focal_utils::{load_image, timing_guard};
use image::DynamicImage;

use crate::model::YoloModel;
use crate::postprocess::{Detection, PostprocessConfig, apply_postprocess};
use crate::preprocess::{
    PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
};

/// Anything that can find objects in an image.
///
/// Implementations are built once at startup and shared between requests, so
/// they must be `Send + Sync`. Detections come back in pixel coordinates of
/// the image that was passed in, strongest first.
pub trait Detector: Send + Sync {
    fn detect_image(&self, image: &DynamicImage) -> Result<Vec<Detection>>;

    /// Detect objects in an image stored on disk.
    fn detect_path(&self, path: &Path) -> Result<Vec<Detection>> {
        let image = load_image(path)
            .with_context(|| format!("failed to load image from {}", path.display()))?;
        self.detect_image(&image)
    }
}

/// YOLOv8 detector backed by an ONNX model.
#[derive(Debug)]
pub struct YoloDetector {
    model: YoloModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
}

impl YoloDetector {
    /// Construct a detector from a model path and configuration.
    ///
    /// # Arguments
    ///
    /// * `model_path` - The path to the ONNX model file.
    /// * `preprocess` - The configuration for image preprocessing.
    /// * `postprocess` - The configuration for detection postprocessing.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
    ) -> Result<Self> {
        let model = YoloModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
        })
    }

    pub fn postprocess_config(&self) -> &PostprocessConfig {
        &self.postprocess
    }

    pub fn preprocess_config(&self) -> &PreprocessConfig {
        &self.preprocess
    }

    fn run_preprocessed(&self, prep: PreprocessOutput) -> Result<Vec<Detection>> {
        let _guard = timing_guard("focal_core::run_preprocessed", log::Level::Trace);

        let raw = {
            let _guard = timing_guard("focal_core::onnx_inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };

        let _guard = timing_guard("focal_core::postprocess", log::Level::Debug);
        apply_postprocess(&raw, prep.scale_x, prep.scale_y, &self.postprocess)
    }
}

impl Detector for YoloDetector {
    fn detect_image(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let _guard = timing_guard("focal_core::detect_image", log::Level::Debug);
        let prep = {
            let _guard = timing_guard("focal_core::preprocess", log::Level::Debug);
            preprocess_dynamic_image(image, &self.preprocess)?
        };
        let detections = self.run_preprocessed(prep)?;
        log::debug!("Detector returned {} objects", detections.len());
        Ok(detections)
    }

    fn detect_path(&self, path: &Path) -> Result<Vec<Detection>> {
        let _guard = timing_guard("focal_core::detect_path", log::Level::Debug);
        let prep = preprocess_image(path, &self.preprocess)?;
        let detections = self.run_preprocessed(prep)?;
        log::debug!(
            "Detector returned {} objects for {}",
            detections.len(),
            path.display()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::BoundingBox;
    use image::RgbImage;

    struct Fixed(Vec<Detection>);

    impl Detector for Fixed {
        fn detect_image(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn detect_path_loads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        let detector = Fixed(vec![Detection {
            class_id: 2,
            confidence: 0.5,
            bbox: BoundingBox::new(0.0, 0.0, 2.0, 2.0),
        }]);
        assert_eq!(detector.detect_path(&path).unwrap().len(), 1);
        assert!(detector.detect_path(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn yolo_detector_requires_model_file() {
        let result = YoloDetector::new(
            "models/does-not-exist.onnx",
            PreprocessConfig::default(),
            PostprocessConfig::default(),
        );
        assert!(result.is_err());
    }
}
