//! Record keys: `"{cx},{cz},{worldType},{version}"`.

use std::fmt;
use std::str::FromStr;

use strata_procedural::ChunkCoord;

use crate::error::{CacheError, CacheResult};

/// Identity of a cached chunk record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    /// Chunk X.
    pub cx: i32,
    /// Chunk Z.
    pub cz: i32,
    /// World flavor the chunk was generated for.
    pub world_type: String,
    /// Generator version; records of other versions are never served.
    pub version: u32,
}

impl ChunkKey {
    /// Creates a key.
    ///
    /// # Errors
    ///
    /// `InvalidKey` if `world_type` is empty or contains a comma, which would
    /// make the textual form ambiguous.
    pub fn new(coord: ChunkCoord, world_type: impl Into<String>, version: u32) -> CacheResult<Self> {
        let world_type = world_type.into();
        if world_type.is_empty() || world_type.contains(',') {
            return Err(CacheError::InvalidKey(world_type));
        }
        Ok(Self {
            cx: coord.x,
            cz: coord.z,
            world_type,
            version,
        })
    }

    /// Chunk coordinate of the key.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.cx, self.cz)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.cx, self.cz, self.world_type, self.version)
    }
}

impl FromStr for ChunkKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CacheError::InvalidKey(s.to_owned());
        let mut parts = s.split(',');
        let (Some(cx), Some(cz), Some(world_type), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let cx = cx.parse().map_err(|_| invalid())?;
        let cz = cz.parse().map_err(|_| invalid())?;
        let version = version.parse().map_err(|_| invalid())?;
        Self::new(ChunkCoord::new(cx, cz), world_type, version).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = ChunkKey::new(ChunkCoord::new(-3, 12), "default", 2).unwrap();
        assert_eq!(key.to_string(), "-3,12,default,2");
    }

    #[test]
    fn test_key_parse() {
        let key: ChunkKey = "7,-1,islands,5".parse().unwrap();
        assert_eq!(key.coord(), ChunkCoord::new(7, -1));
        assert_eq!(key.world_type, "islands");
        assert_eq!(key.version, 5);
    }

    #[test]
    fn test_key_rejects_malformed() {
        for bad in ["", "1,2,default", "1,2,default,3,4", "a,2,default,1", "1,2,,1", "1,2,default,-1"] {
            assert!(bad.parse::<ChunkKey>().is_err(), "{bad:?} parsed");
        }
    }

    #[test]
    fn test_world_type_with_comma_is_invalid() {
        assert!(matches!(
            ChunkKey::new(ChunkCoord::new(0, 0), "a,b", 1),
            Err(CacheError::InvalidKey(_))
        ));
    }
}
