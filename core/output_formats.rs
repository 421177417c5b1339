use crate::chunking::ChunkInfo;
#[cfg(feature = "serde_support")]
use crate::error::{AppError, Result};
#[cfg(feature = "serde_support")]
use serde::Serialize;

/// File name of the unchunked package.
pub fn package_file_name(base: &str) -> String {
    format!("{}_context.txt", base)
}

/// File name of one chunk, e.g. `shop_chunk_2.txt`.
pub fn chunk_file_name(base: &str, info: &ChunkInfo) -> String {
    format!("{}_chunk_{}.txt", base, info.current_part)
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_json<T: Serialize>(data: &T, pretty: bool) -> Result<String, AppError> {
    if pretty {
        serde_json::to_string_pretty(data).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(data).map_err(AppError::JsonSerialize)
    }
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_yaml<T: Serialize>(data: &T) -> Result<String, AppError> {
    serde_yml::to_string(data).map_err(AppError::YamlError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn file_names() {
        let info = ChunkInfo {
            current_part: 2,
            total_parts: 3,
        };
        assert_eq!(chunk_file_name("shop", &info), "shop_chunk_2.txt");
        assert_eq!(package_file_name("shop"), "shop_context.txt");
    }

    #[test]
    fn json_keeps_map_order() {
        let mut map = IndexMap::new();
        map.insert("z", 1);
        map.insert("a", 2);
        assert_eq!(serialize_to_json(&map, false).unwrap(), r#"{"z":1,"a":2}"#);
        assert!(serialize_to_json(&map, true).unwrap().contains("\n"));
        assert_eq!(serialize_to_yaml(&map).unwrap(), "z: 1\na: 2\n");
    }
}
