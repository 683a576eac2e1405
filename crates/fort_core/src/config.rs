//! Build configuration.
//!
//! Everything tunable about a build world lives in [`BuildConfig`], which is
//! loaded from RON.
//!
//! # Example RON
//!
//! ```ron
//! BuildConfig(
//!     tile_size: 512,
//!     level_height: 384,
//!     ground_level: 0,
//!     min_level: 0,
//!     max_level: 127,
//!     max_tile_extent: 100000,
//!     wall_policy: EitherSide,
//!     materials: MaterialTable(wood: 150, stone: 300, metal: 500),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::grid::{GridCoordinate, GridMapper};
use crate::math::Fixed;
use crate::structure::MaterialTier;
use crate::support::WallSupportPolicy;

/// Maximum hit points per material tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTable {
    /// Wood max HP.
    pub wood: u32,
    /// Stone max HP.
    pub stone: u32,
    /// Metal max HP.
    pub metal: u32,
}

impl MaterialTable {
    /// Max HP for a tier.
    #[must_use]
    pub const fn max_hp(&self, tier: MaterialTier) -> u32 {
        match tier {
            MaterialTier::Wood => self.wood,
            MaterialTier::Stone => self.stone,
            MaterialTier::Metal => self.metal,
        }
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self {
            wood: 150,
            stone: 300,
            metal: 500,
        }
    }
}

/// Tunables for one build world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// World units per tile on X and Z.
    pub tile_size: u32,
    /// World units per level on Y.
    pub level_height: u32,
    /// Level the built-in flat terrain supports.
    pub ground_level: i32,
    /// Lowest buildable level (inclusive).
    pub min_level: i32,
    /// Highest buildable level (inclusive).
    pub max_level: i32,
    /// Largest buildable `|x|` and `|z|`.
    pub max_tile_extent: u32,
    /// How many floors a wall needs beside it.
    pub wall_policy: WallSupportPolicy,
    /// Hit points per material.
    pub materials: MaterialTable,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tile_size: 512,
            level_height: 384,
            ground_level: 0,
            min_level: 0,
            max_level: 127,
            max_tile_extent: 100_000,
            wall_policy: WallSupportPolicy::EitherSide,
            materials: MaterialTable::default(),
        }
    }
}

impl BuildConfig {
    /// Load and validate a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CoreError::InvalidConfig(format!("Failed to serialize config: {e}")))
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(CoreError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.level_height == 0 {
            return Err(CoreError::InvalidConfig(
                "level_height must be positive".into(),
            ));
        }
        // Keep world coordinates of every buildable cell inside the fixed-point range.
        if i64::from(self.tile_size) * i64::from(self.max_tile_extent) > i64::from(i32::MAX) {
            return Err(CoreError::InvalidConfig(format!(
                "tile_size * max_tile_extent exceeds {}",
                i32::MAX
            )));
        }
        if self.min_level > self.max_level {
            return Err(CoreError::InvalidConfig(format!(
                "min_level {} is above max_level {}",
                self.min_level, self.max_level
            )));
        }
        if self.max_level == i32::MAX || self.min_level == i32::MIN {
            return Err(CoreError::InvalidConfig(
                "level bounds must leave room for the cells above and below".into(),
            ));
        }
        let materials = self.materials;
        if materials.wood == 0 || materials.stone == 0 || materials.metal == 0 {
            return Err(CoreError::InvalidConfig(
                "material max HP must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Coordinate mapper for these cell dimensions.
    #[must_use]
    pub fn mapper(&self) -> GridMapper {
        GridMapper::new(
            Fixed::from_num(self.tile_size),
            Fixed::from_num(self.level_height),
        )
    }

    /// Whether a cell lies inside the build bounds.
    #[must_use]
    pub fn in_bounds(&self, coord: GridCoordinate) -> bool {
        coord.level >= self.min_level
            && coord.level <= self.max_level
            && coord.x.unsigned_abs() <= self.max_tile_extent
            && coord.z.unsigned_abs() <= self.max_tile_extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_full_ron() {
        let ron = r#"
            BuildConfig(
                tile_size: 4,
                level_height: 3,
                ground_level: 1,
                min_level: -2,
                max_level: 10,
                max_tile_extent: 64,
                wall_policy: BothSides,
                materials: MaterialTable(wood: 10, stone: 20, metal: 30),
            )
        "#;
        let config = BuildConfig::from_ron_str(ron).unwrap();
        assert_eq!(config.tile_size, 4);
        assert_eq!(config.ground_level, 1);
        assert_eq!(config.min_level, -2);
        assert_eq!(config.wall_policy, WallSupportPolicy::BothSides);
        assert_eq!(config.materials.max_hp(MaterialTier::Stone), 20);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = BuildConfig::from_ron_str("BuildConfig(tile_size: 8)").unwrap();
        assert_eq!(config.tile_size, 8);
        assert_eq!(config.level_height, 384);
        assert_eq!(config.wall_policy, WallSupportPolicy::EitherSide);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            BuildConfig::from_ron_str("BuildConfig(tile_size: 0)"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            BuildConfig::from_ron_str("BuildConfig(min_level: 5, max_level: 1)"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            BuildConfig::from_ron_str("BuildConfig(materials: MaterialTable(wood: 0, stone: 1, metal: 1))"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            BuildConfig::from_ron_str("BuildConfig(tile_size: 100000, max_tile_extent: 100000)"),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        assert!(matches!(
            BuildConfig::from_ron_str("BuildConfig(tile_size: \"big\")"),
            Err(CoreError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_ron_round_trip() {
        let config = BuildConfig {
            wall_policy: WallSupportPolicy::BothSides,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(BuildConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.ron");
        std::fs::write(&path, "BuildConfig(level_height: 300)").unwrap();
        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.level_height, 300);

        assert!(matches!(
            BuildConfig::load(dir.path().join("missing.ron")),
            Err(CoreError::Io(_))
        ));
    }

    #[test]
    fn test_in_bounds() {
        let config = BuildConfig {
            max_tile_extent: 10,
            ..Default::default()
        };
        assert!(config.in_bounds(GridCoordinate::new(10, -10, 0)));
        assert!(config.in_bounds(GridCoordinate::new(0, 0, 127)));
        assert!(!config.in_bounds(GridCoordinate::new(11, 0, 0)));
        assert!(!config.in_bounds(GridCoordinate::new(0, 0, -1)));
        assert!(!config.in_bounds(GridCoordinate::new(0, 0, 128)));
    }

    #[test]
    fn test_mapper_uses_dimensions() {
        let mapper = BuildConfig::default().mapper();
        assert_eq!(mapper.tile_size(), Fixed::from_num(512));
        assert_eq!(mapper.level_height(), Fixed::from_num(384));
    }
}
