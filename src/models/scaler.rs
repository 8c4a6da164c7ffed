//! Fitted feature scalers, serialized as JSON next to the classifier.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Transform applied to the numeric log columns before classification.
pub trait Scaler: Send + Sync {
    fn n_features(&self) -> usize;

    /// Column names the scaler was fitted on, when the training frame had them.
    fn feature_names(&self) -> Option<&[String]>;

    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl ScalerArtifact {
    pub fn validate(&self) -> Result<(), Error> {
        let (a, b, names) = match self {
            ScalerArtifact::Standard { mean, scale, feature_names } => (mean.len(), scale.len(), feature_names),
            ScalerArtifact::MinMax { data_min, data_max, feature_names, .. } => {
                (data_min.len(), data_max.len(), feature_names)
            }
        };
        if a == 0 {
            return Err(Error::Config("scaler has no features".into()));
        }
        if a != b {
            return Err(Error::Config(format!(
                "scaler parameter lengths differ ({} vs {})",
                a, b
            )));
        }
        if let Some(names) = names {
            if names.len() != a {
                return Err(Error::Config(format!(
                    "scaler lists {} feature names for {} features",
                    names.len(),
                    a
                )));
            }
        }
        Ok(())
    }
}

impl Scaler for ScalerArtifact {
    fn n_features(&self) -> usize {
        match self {
            ScalerArtifact::Standard { mean, .. } => mean.len(),
            ScalerArtifact::MinMax { data_min, .. } => data_min.len(),
        }
    }

    fn feature_names(&self) -> Option<&[String]> {
        match self {
            ScalerArtifact::Standard { feature_names, .. } | ScalerArtifact::MinMax { feature_names, .. } => {
                feature_names.as_deref()
            }
        }
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, Error> {
        let n = self.n_features();
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(Error::DataShape(format!(
                    "row {} has {} numeric features, the scaler was fitted on {}",
                    i + 1,
                    row.len(),
                    n
                )));
            }
            let scaled = match self {
                ScalerArtifact::Standard { mean, scale, .. } => row
                    .iter()
                    .zip(mean.iter().zip(scale))
                    .map(|(x, (m, s))| {
                        // Constant features were fitted with scale 0.
                        let s = if *s == 0.0 { 1.0 } else { *s };
                        (x - m) / s
                    })
                    .collect(),
                ScalerArtifact::MinMax { data_min, data_max, feature_range, .. } => {
                    let (lo, hi) = *feature_range;
                    row.iter()
                        .zip(data_min.iter().zip(data_max))
                        .map(|(x, (min, max))| {
                            let span = max - min;
                            let span = if span == 0.0 { 1.0 } else { span };
                            lo + (x - min) / span * (hi - lo)
                        })
                        .collect()
                }
            };
            out.push(scaled);
        }
        Ok(out)
    }
}
