use serde_json::{Map, Value};

use crate::Error;
use crate::pca::RadialProjections;

/// Options that only make sense for the final representation and not for the
/// intermediate spherical expansion.
const NON_EXPANSION_OPTIONS: &[&str] = &[
    "normalize",
    "soap_type",
    "compute_gradients",
    "inversion_symmetry",
];

/// Default accuracy of the splines used for the radial integral, used when the
/// hyper-parameters do not specify one.
pub const DEFAULT_SPLINE_ACCURACY: f64 = 1e-8;

/// Hyper-parameters describing how to build a calculator, as a mapping from
/// option name to JSON value.
///
/// All the functions deriving new hyper-parameters from existing ones return a
/// new `Hypers` and leave `self` untouched.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Hypers(Map<String, Value>);

impl Hypers {
    /// Create an empty set of hyper-parameters
    pub fn new() -> Hypers {
        Hypers(Map::new())
    }

    /// Parse hyper-parameters from a JSON string containing an object
    pub fn from_json(json: &str) -> Result<Hypers, Error> {
        match serde_json::from_str(json)? {
            Value::Object(map) => Ok(Hypers(map)),
            other => Err(Error::InvalidParameter(format!(
                "hyper-parameters must be a JSON object, got '{}'", other
            ))),
        }
    }

    /// Serialize these hyper-parameters to a JSON string
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deserialize these hyper-parameters into a typed parameters struct
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        let parameters = serde_json::from_value(Value::Object(self.0.clone()))?;
        return Ok(parameters);
    }

    /// Get a non-negative integer option
    pub fn usize(&self, name: &str) -> Result<usize, Error> {
        let value = self.0.get(name).ok_or_else(|| Error::InvalidParameter(
            format!("missing '{}' in hyper-parameters", name)
        ))?;

        value.as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| Error::InvalidParameter(format!(
                "'{}' must be a non-negative integer, got {}", name, value
            )))
    }

    /// Get the `max_radial` option, i.e. the number of radial basis functions
    pub fn max_radial(&self) -> Result<usize, Error> {
        let max_radial = self.usize("max_radial")?;
        if max_radial == 0 {
            return Err(Error::InvalidParameter("'max_radial' must be at least 1".into()));
        }
        Ok(max_radial)
    }

    /// Get the `max_angular` option
    pub fn max_angular(&self) -> Result<usize, Error> {
        self.usize("max_angular")
    }

    /// Derive the hyper-parameters of the spherical expansion used to estimate
    /// the optimal radial basis.
    ///
    /// This removes the options which do not apply to a density expansion
    /// (normalization, SOAP type, gradients, inversion symmetry and any
    /// existing radial dimensionality reduction), and sets `max_radial` to
    /// `expanded_max_radial`, or twice the current `max_radial` if it is
    /// `None`.
    pub fn spherical_expansion(&self, expanded_max_radial: Option<usize>) -> Result<Hypers, Error> {
        let max_radial = self.max_radial()?;
        let expanded_max_radial = match expanded_max_radial {
            Some(expanded) if expanded < max_radial => {
                return Err(Error::InvalidParameter(format!(
                    "expanded max_radial ({}) must be larger than or equal to max_radial ({})",
                    expanded, max_radial
                )));
            }
            Some(expanded) => expanded,
            None => 2 * max_radial,
        };

        let mut hypers = self.clone();
        for option in NON_EXPANSION_OPTIONS {
            hypers.remove(option);
        }

        if let Some(optimization) = hypers.0.get_mut("optimization") {
            if let Some(optimization) = optimization.as_object_mut() {
                optimization.remove("RadialDimReduction");
            }
        }

        hypers.insert("max_radial", expanded_max_radial);
        return Ok(hypers);
    }

    /// Create new hyper-parameters containing the given radial basis
    /// `projections` in `optimization.RadialDimReduction.projection_matrices`.
    ///
    /// Any previous projection matrices are overwritten. If there is no
    /// `optimization.Spline` entry, it is set to
    /// `{"accuracy": DEFAULT_SPLINE_ACCURACY}`, otherwise the existing entry
    /// is kept as is.
    pub fn with_radial_projections(&self, projections: &RadialProjections) -> Result<Hypers, Error> {
        let mut hypers = self.clone();

        let optimization = hypers.0.entry("optimization")
            .or_insert_with(|| Value::Object(Map::new()));
        let optimization = match optimization {
            Value::Object(optimization) => optimization,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "'optimization' must be a JSON object, got {}", other
                )));
            }
        };

        let mut reduction = Map::new();
        reduction.insert("projection_matrices".into(), projections.to_json()?);
        optimization.insert("RadialDimReduction".into(), Value::Object(reduction));

        if !optimization.contains_key("Spline") {
            optimization.insert("Spline".into(), serde_json::json!({
                "accuracy": DEFAULT_SPLINE_ACCURACY
            }));
        }

        return Ok(hypers);
    }
}

impl From<Map<String, Value>> for Hypers {
    fn from(map: Map<String, Value>) -> Hypers {
        Hypers(map)
    }
}

impl TryFrom<Value> for Hypers {
    type Error = Error;

    fn try_from(value: Value) -> Result<Hypers, Error> {
        match value {
            Value::Object(map) => Ok(Hypers(map)),
            other => Err(Error::InvalidParameter(format!(
                "hyper-parameters must be a JSON object, got '{}'", other
            ))),
        }
    }
}

impl std::str::FromStr for Hypers {
    type Err = Error;

    fn from_str(s: &str) -> Result<Hypers, Error> {
        Hypers::from_json(s)
    }
}
