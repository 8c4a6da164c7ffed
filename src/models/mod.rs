pub mod classifier;
pub mod scaler;

pub use classifier::{Classifier, ClassifierArtifact, TreeNode};
pub use scaler::{Scaler, ScalerArtifact};

use crate::error::Error;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loaded classifier and scaler. Read-only after construction; clone the `Arc`s to share.
#[derive(Clone)]
pub struct InferenceContext {
    pub classifier: Arc<dyn Classifier>,
    pub scaler: Arc<dyn Scaler>,
}

impl std::fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceContext")
            .field("n_features", &self.scaler.n_features())
            .field("feature_names", &self.scaler.feature_names())
            .finish()
    }
}

impl InferenceContext {
    pub fn new(classifier: Arc<dyn Classifier>, scaler: Arc<dyn Scaler>) -> Result<Self, Error> {
        if classifier.n_features() != scaler.n_features() {
            return Err(Error::Config(format!(
                "scaler was fitted on {} features but the model expects {}",
                scaler.n_features(),
                classifier.n_features()
            )));
        }
        Ok(Self { classifier, scaler })
    }

    /// Load both artifacts. Any failure names both files so the operator knows what to check.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, Error> {
        let hint = |e: Error| {
            Error::Config(format!(
                "Could not load the model. Check {} and {}: {}",
                model_path.display(),
                scaler_path.display(),
                match e {
                    Error::Config(msg) => msg,
                    other => other.to_string(),
                }
            ))
        };
        let classifier: ClassifierArtifact = read_artifact(model_path).map_err(hint)?;
        classifier.validate().map_err(hint)?;
        let scaler: ScalerArtifact = read_artifact(scaler_path).map_err(hint)?;
        scaler.validate().map_err(hint)?;
        let ctx = Self::new(Arc::new(classifier), Arc::new(scaler)).map_err(hint)?;
        info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            n_features = ctx.scaler.n_features(),
            "Model artifacts loaded"
        );
        Ok(ctx)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Config(format!("{} not found", path.display()))
        } else {
            Error::Config(format!("could not read {}: {}", path.display(), e))
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Config(format!("{} is not a valid artifact: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_matching_artifacts() {
        let model = write(r#"{"kind":"linear","classes":[0,1],"coef":[[1.0,2.0]],"intercept":[0.0]}"#);
        let scaler = write(r#"{"kind":"standard","mean":[0.0,0.0],"scale":[1.0,1.0]}"#);
        let ctx = InferenceContext::load(model.path(), scaler.path()).unwrap();
        assert_eq!(ctx.scaler.n_features(), 2);
    }

    #[test]
    fn feature_count_mismatch_is_config_error() {
        let model = write(r#"{"kind":"linear","classes":[0,1],"coef":[[1.0,2.0,3.0]],"intercept":[0.0]}"#);
        let scaler = write(r#"{"kind":"standard","mean":[0.0,0.0],"scale":[1.0,1.0]}"#);
        let err = InferenceContext::load(model.path(), scaler.path()).unwrap_err();
        assert!(err.to_string().contains("fitted on 2 features"));
    }

    #[test]
    fn missing_file_names_both_artifacts() {
        let scaler = write(r#"{"kind":"standard","mean":[0.0],"scale":[1.0]}"#);
        let err = InferenceContext::load(Path::new("no_such_model.json"), scaler.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no_such_model.json not found"));
        assert!(msg.contains(&scaler.path().display().to_string()));
    }

    #[test]
    fn corrupt_artifact_is_config_error() {
        let model = write("not json");
        let scaler = write(r#"{"kind":"standard","mean":[0.0],"scale":[1.0]}"#);
        assert!(matches!(
            InferenceContext::load(model.path(), scaler.path()),
            Err(Error::Config(_))
        ));
    }
}
