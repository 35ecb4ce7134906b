//! Water configuration.
//!
//! [`WaterConfig`] is a plain struct with sensible defaults. Override the
//! public fields before handing it to [`crate::render::RenderSubsystem::new`].

use std::path::PathBuf;

use anyhow::bail;

use crate::{backend::TextureUnit, data_structures::water::WATER_LEVEL};

pub const DISTORTION_MAP_PATH: &str = "assets/water_textures/dudvmap.png";
pub const NORMAL_MAP_PATH: &str = "assets/water_textures/normalmap.png";

/// Sampler names the water program declares.
pub const DISTORTION_SAMPLER: &str = "dudv_map";
pub const NORMAL_SAMPLER: &str = "normal_map";

/// Base tint of the water. Provisional, the final look comes from the maps.
pub const DEFAULT_TINT: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Mapping from logical sampler name to the texture unit it samples from.
///
/// Construction rejects two samplers sharing a unit, so a texture bound for
/// one sampler can never be overwritten by another within a draw.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerUnits {
    entries: Vec<(String, TextureUnit)>,
}

impl SamplerUnits {
    pub fn new<I, S>(entries: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (S, TextureUnit)>,
        S: Into<String>,
    {
        let mut units = Self {
            entries: Vec::new(),
        };
        for (name, unit) in entries {
            let name = name.into();
            if let Some((other, _)) = units.entries.iter().find(|(_, u)| *u == unit) {
                bail!("samplers `{other}` and `{name}` both use texture unit {}", unit.0);
            }
            if units.unit(&name).is_some() {
                bail!("sampler `{name}` is mapped twice");
            }
            units.entries.push((name, unit));
        }
        Ok(units)
    }

    /// Unit assigned to `sampler`, if any.
    pub fn unit(&self, sampler: &str) -> Option<TextureUnit> {
        self.entries
            .iter()
            .find(|(name, _)| name == sampler)
            .map(|(_, unit)| *unit)
    }
}

impl Default for SamplerUnits {
    fn default() -> Self {
        Self {
            entries: vec![
                (DISTORTION_SAMPLER.to_string(), TextureUnit(0)),
                (NORMAL_SAMPLER.to_string(), TextureUnit(1)),
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct WaterConfig {
    /// Directory asset paths are resolved against.
    pub base_path: PathBuf,
    pub distortion_map: String,
    pub normal_map: String,
    pub samplers: SamplerUnits,
    pub tint: [f32; 4],
    /// Height of the untransformed quad.
    pub water_level: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./"),
            distortion_map: DISTORTION_MAP_PATH.to_string(),
            normal_map: NORMAL_MAP_PATH.to_string(),
            samplers: SamplerUnits::default(),
            tint: DEFAULT_TINT,
            water_level: WATER_LEVEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_units_are_distinct() {
        let units = SamplerUnits::default();
        assert_eq!(units.unit(DISTORTION_SAMPLER), Some(TextureUnit(0)));
        assert_eq!(units.unit(NORMAL_SAMPLER), Some(TextureUnit(1)));
        assert_eq!(units.unit("specular"), None);
    }

    #[test]
    fn shared_unit_is_rejected() {
        let err = SamplerUnits::new([(DISTORTION_SAMPLER, TextureUnit(2)), (NORMAL_SAMPLER, TextureUnit(2))])
            .unwrap_err();
        assert!(err.to_string().contains("texture unit 2"), "{err}");
    }

    #[test]
    fn custom_units_resolve_by_name() {
        let units =
            SamplerUnits::new([(NORMAL_SAMPLER, TextureUnit(3)), (DISTORTION_SAMPLER, TextureUnit(5))]).unwrap();
        assert_eq!(units.unit(DISTORTION_SAMPLER), Some(TextureUnit(5)));
        assert_eq!(units.unit(NORMAL_SAMPLER), Some(TextureUnit(3)));
    }
}
