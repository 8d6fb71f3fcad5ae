//! Civic issue classifier
//!
//! MobileNetV3-Small backbone with a 576 -> 1024 -> N head, exported from
//! the training checkpoint. One forward pass per image; the answer is the
//! argmax class with its softmax probability.

use std::sync::Arc;

use image::DynamicImage;
use ndarray::Array4;
use openvino::{ElementType, Shape, Tensor};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pool::ModelPool;
use super::preprocess::{preprocess_for_classification, CLASSIFIER_INPUT_SIZE};
use crate::utils::math::{argmax, softmax};

/// Model output order for the 6-class model
pub const CLASS_NAMES: [&str; 6] = [
    "damaged_signs",
    "fallen_trees",
    "garbage",
    "graffiti",
    "illegal_parking",
    "potholes",
];

/// Class labels for a model trained with `num_classes` outputs.
/// The 5-class model was trained without `illegal_parking`.
pub fn class_names_for(num_classes: usize) -> Result<Vec<&'static str>> {
    match num_classes {
        6 => Ok(CLASS_NAMES.to_vec()),
        5 => Ok(CLASS_NAMES
            .iter()
            .copied()
            .filter(|name| *name != "illegal_parking")
            .collect()),
        n => anyhow::bail!("num_classes must be 5 or 6, got {}", n),
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub issue_type: String,
    pub confidence: f32,
}

/// Pick the winning class from raw logits
pub fn decide(logits: &[f32], class_names: &[&str]) -> Result<Classification> {
    if logits.len() != class_names.len() {
        anyhow::bail!(
            "model produced {} outputs but {} classes are configured",
            logits.len(),
            class_names.len()
        );
    }

    let probs = softmax(logits);
    let idx = argmax(&probs);

    Ok(Classification {
        issue_type: class_names[idx].to_string(),
        confidence: probs[idx],
    })
}

/// Seam between the service layer and the inference engine
pub trait ImageClassifier: Send + Sync + 'static {
    /// Classify a decoded image. Blocking.
    fn classify(&self, image: &DynamicImage) -> Result<Classification>;

    fn model_loaded(&self) -> bool;

    fn model_path(&self) -> String;
}

/// OpenVINO-backed issue classifier
pub struct IssueClassifier {
    pool: Arc<ModelPool>,
    class_names: Vec<&'static str>,
}

impl IssueClassifier {
    pub fn new(pool: Arc<ModelPool>, num_classes: usize) -> Result<Self> {
        Ok(Self {
            pool,
            class_names: class_names_for(num_classes)?,
        })
    }

    pub fn class_names(&self) -> &[&'static str] {
        &self.class_names
    }

    /// Run the network and return raw logits
    fn infer(&self, input_tensor: &Array4<f32>) -> Result<Vec<f32>> {
        let (target_w, target_h) = CLASSIFIER_INPUT_SIZE;

        let model = self.pool.get_model()?;
        let mut request = model.create_infer_request()?;

        let input_shape = Shape::new(&[1, 3, target_h as i64, target_w as i64])?;
        let mut input = Tensor::new(ElementType::F32, &input_shape)?;

        let input_data = input_tensor
            .as_slice()
            .context("input tensor is not contiguous")?;
        unsafe {
            let tensor_data = input.get_raw_data_mut()?.as_mut_ptr() as *mut f32;
            std::ptr::copy_nonoverlapping(input_data.as_ptr(), tensor_data, input_data.len());
        }

        request.set_input_tensor(&input)?;
        request.infer()?;

        let output = request.get_output_tensor()?;
        let output_shape = output.get_shape()?;
        let output_len = output_shape.get_dimensions().iter().product::<i64>() as usize;

        let logits: Vec<f32> = unsafe {
            let ptr = output.get_raw_data()?.as_ptr() as *const f32;
            std::slice::from_raw_parts(ptr, output_len).to_vec()
        };

        debug!("Classifier logits: {:?}", logits);
        Ok(logits)
    }
}

impl ImageClassifier for IssueClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Classification> {
        let tensor = preprocess_for_classification(image);
        let logits = self.infer(&tensor)?;
        decide(&logits, &self.class_names)
    }

    fn model_loaded(&self) -> bool {
        self.pool.is_loaded()
    }

    fn model_path(&self) -> String {
        self.pool.model_path().display().to_string()
    }
}
