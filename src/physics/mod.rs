pub mod material;

pub use material::{
    Material, MaterialProperty, PropertyMethod, PropertyModel,
    DENSITY, SPECIFIC_HEAT, THERMAL_CONDUCTIVITY,
};
