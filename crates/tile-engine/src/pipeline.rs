//! The synchronous value transform applied after sampling.
//!
//! Each component is scaled and converted to Celsius if needed. The
//! components then combine into one field. A climatology, when given, is
//! subtracted last. The result's mask is the union of every input mask.

use ocean_common::{ScalarField, TileError, TileResult};

pub const KELVIN_OFFSET: f64 = 273.15;

/// Multiply by the variable's registered scale factor.
pub fn apply_scale_factor(field: &mut ScalarField) {
    let factor = field.scale_factor;
    if factor != 1.0 {
        field.map_valid(|v| v * factor);
        field.scale_factor = 1.0;
    }
}

/// Convert a Kelvin field to Celsius and rename its unit. Leaves any other
/// unit untouched.
pub fn kelvin_to_celsius(field: &mut ScalarField) {
    if field.unit.starts_with("Kelvin") {
        field.map_valid(|v| v - KELVIN_OFFSET);
        field.unit = field.unit.replacen("Kelvin", "Celsius", 1);
    }
}

/// Scale and unit-convert one sampled component.
pub fn prepare_component(mut field: ScalarField) -> ScalarField {
    apply_scale_factor(&mut field);
    kelvin_to_celsius(&mut field);
    field
}

/// One component passes through; two become their magnitude.
pub fn combine_components(mut components: Vec<ScalarField>) -> TileResult<ScalarField> {
    match components.len() {
        1 => Ok(components.remove(0)),
        2 => {
            let (u, v) = (&components[0], &components[1]);
            u.zip_with(v, |a, b| a.hypot(b))
        }
        n => Err(TileError::UnsupportedComponents(n)),
    }
}

/// Elementwise `field - climatology`.
pub fn subtract_climatology(field: &ScalarField, climatology: &ScalarField) -> TileResult<ScalarField> {
    field.zip_with(climatology, |v, c| v - c)
}

/// The full transform: prepare, combine, then subtract the climatology.
///
/// `climatology` holds the same components sampled from the climatology
/// dataset and goes through the same preparation.
pub fn transform_values(
    components: Vec<ScalarField>,
    climatology: Option<Vec<ScalarField>>,
) -> TileResult<ScalarField> {
    let field = combine_components(components.into_iter().map(prepare_component).collect())?;
    match climatology {
        None => Ok(field),
        Some(clim) => {
            let clim = combine_components(clim.into_iter().map(prepare_component).collect())?;
            subtract_climatology(&field, &clim)
        }
    }
}
