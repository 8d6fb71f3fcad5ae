//! Inference engine module
//!
//! OpenVINO-based issue classification:
//! - Model loading with optional idle unloading
//! - ImageNet-style preprocessing
//! - Softmax/argmax decision

pub mod pool;
pub mod classifier;
pub mod preprocess;

pub use pool::ModelPool;
pub use classifier::{Classification, ImageClassifier, IssueClassifier};
