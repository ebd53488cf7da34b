use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::*;

use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Wrapper around a YOLO ONNX runnable model.
///
/// Loads the graph with a fixed `[1, 3, H, W]` input, prepares it for execution, and runs inference.
#[derive(Debug)]
pub struct YoloModel {
    runnable: RunnableModel,
    input_size: InputSize,
}

impl YoloModel {
    /// Load and optimize the ONNX graph for a specific input size.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, input_size, true) {
            Ok(model) => {
                debug!(
                    "YOLO model {} optimized successfully ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "YOLO model {} failed optimized load ({}); using decluttered graph.\nError chain:\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                load_runnable_model(path, input_size, false).with_context(|| {
                    format!("decluttered YOLO graph also failed after optimize error: {optimize_msg}")
                })?
            }
        };

        Ok(Self {
            runnable,
            input_size,
        })
    }

    /// Execute the model on a preprocessed `[1, 3, H, W]` tensor.
    ///
    /// Returns the first output, normally `[1, 4 + classes, anchors]` in input-pixel space.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        check_input_shape(input.shape(), self.input_size)?;
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("YOLO execution failed: {e}"))?;

        outputs
            .into_iter()
            .next()
            .map(|value| value.into_tensor())
            .ok_or_else(|| anyhow::anyhow!("YOLO model produced no outputs"))
    }
}

/// The graph is loaded for one fixed input fact; anything else fails deep inside tract.
fn check_input_shape(shape: &[usize], input_size: InputSize) -> Result<()> {
    let expected = [
        1,
        3,
        input_size.height as usize,
        input_size.width as usize,
    ];
    anyhow::ensure!(
        shape == expected,
        "YOLO input must have shape {:?}, got {:?}",
        expected,
        shape
    );
    Ok(())
}

fn load_runnable_model(path: &Path, input_size: InputSize, optimized: bool) -> Result<RunnableModel> {
    let shape = tvec!(
        1usize,
        3,
        input_size.height as usize,
        input_size.width as usize
    );
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?
        .with_input_fact(0, f32::fact(shape).into())
        .map_err(|e| anyhow::anyhow!("unable to set YOLO input shape: {e}"))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize YOLO graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make YOLO graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check YOLO graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter YOLO graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make YOLO graph runnable: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loading_missing_model_fails() {
        let err = YoloModel::load("missing.onnx", InputSize::default()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn input_shape_must_match_loaded_size() {
        let size = InputSize::new(320, 256);
        assert!(check_input_shape(&[1, 3, 256, 320], size).is_ok());
        let err = check_input_shape(&[1, 3, 320, 256], size).unwrap_err();
        assert!(err.to_string().contains("[1, 3, 256, 320]"));
        assert!(check_input_shape(&[3, 256, 320], size).is_err());
    }

    #[test]
    fn invalid_model_produces_useful_error() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(b"not a real onnx file")
            .expect("write mock model");

        let err = YoloModel::load(temp.path(), InputSize::default())
            .expect_err("invalid ONNX should fail");
        let message = format!("{err:#}");
        assert!(
            message.contains("failed to parse ONNX") || message.contains("YOLO graph"),
            "Unexpected error message: {message}"
        );
    }
}
