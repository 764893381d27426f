//! Temperature-dependent material properties.
//!
//! A property is a base value at a reference temperature plus one of four
//! dependency forms, evaluated at `ΔT = T - T_ref`:
//! - constant: `base`
//! - linear: `base · (1 + c0·ΔT)`
//! - polynomial: `base · Σ c_i·ΔT^(n-i)` (highest degree first)
//! - exponential: `base · exp(c0·ΔT)`

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use crate::error::{FvmError, FvmResult};

/// Default reference temperature (K)
pub const DEFAULT_REFERENCE_TEMPERATURE: f64 = 298.15;

pub const THERMAL_CONDUCTIVITY: &str = "thermal_conductivity";
pub const SPECIFIC_HEAT: &str = "specific_heat";
pub const DENSITY: &str = "density";

/// Evaluates a named scalar property at a temperature
///
/// Implementors must be shareable across assembly threads.
pub trait PropertyModel: Sync {
    fn evaluate(&self, name: &str, temperature: f64) -> FvmResult<f64>;
}

/// Form of the temperature dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyMethod {
    Constant,
    Linear,
    Polynomial,
    Exponential,
}

impl FromStr for PropertyMethod {
    type Err = FvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(PropertyMethod::Constant),
            "linear" => Ok(PropertyMethod::Linear),
            "polynomial" => Ok(PropertyMethod::Polynomial),
            "exponential" => Ok(PropertyMethod::Exponential),
            other => Err(FvmError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for PropertyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyMethod::Constant => "constant",
            PropertyMethod::Linear => "linear",
            PropertyMethod::Polynomial => "polynomial",
            PropertyMethod::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

/// One temperature-dependent property
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperty {
    pub base_value: f64,
    pub reference_temperature: f64,
    pub method: PropertyMethod,
    pub coefficients: Vec<f64>,
}

impl MaterialProperty {
    pub fn constant(base_value: f64) -> Self {
        Self {
            base_value,
            reference_temperature: DEFAULT_REFERENCE_TEMPERATURE,
            method: PropertyMethod::Constant,
            coefficients: Vec::new(),
        }
    }

    pub fn new(base_value: f64, method: PropertyMethod, coefficients: Vec<f64>) -> Self {
        Self {
            base_value,
            reference_temperature: DEFAULT_REFERENCE_TEMPERATURE,
            method,
            coefficients,
        }
    }

    pub fn with_reference_temperature(mut self, reference_temperature: f64) -> Self {
        self.reference_temperature = reference_temperature;
        self
    }

    /// Value at `temperature`; missing coefficients count as zero
    pub fn evaluate(&self, temperature: f64) -> f64 {
        let dt = temperature - self.reference_temperature;
        let c0 = self.coefficients.first().copied().unwrap_or(0.0);
        match self.method {
            PropertyMethod::Constant => self.base_value,
            PropertyMethod::Linear => self.base_value * (1.0 + c0 * dt),
            PropertyMethod::Polynomial => self.base_value * polyval(&self.coefficients, dt),
            PropertyMethod::Exponential => self.base_value * (c0 * dt).exp(),
        }
    }
}

/// Horner evaluation, coefficients ordered highest degree first
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Named set of properties for one material
#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    properties: HashMap<String, MaterialProperty>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, property: &str, model: MaterialProperty) -> Self {
        self.add_property(property, model);
        self
    }

    pub fn add_property(&mut self, property: &str, model: MaterialProperty) {
        self.properties.insert(property.to_string(), model);
    }

    pub fn property(&self, property: &str) -> Option<&MaterialProperty> {
        self.properties.get(property)
    }

    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl PropertyModel for Material {
    fn evaluate(&self, name: &str, temperature: f64) -> FvmResult<f64> {
        self.properties
            .get(name)
            .map(|p| p.evaluate(temperature))
            .ok_or_else(|| FvmError::UnknownProperty {
                material: self.name.clone(),
                property: name.to_string(),
            })
    }
}
