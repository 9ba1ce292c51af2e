//! Parsing of localidades API rows (`view=nivelado`).
//!
//! Flattened rows look like
//! `{"UF-id": 53, "UF-sigla": "DF", "UF-nome": "Distrito Federal",
//!   "regiao-id": 5, "regiao-sigla": "CO", "regiao-nome": "Centro-Oeste"}`.
//! The columns prefixed by the requested level become the row's own id,
//! name and abbreviation; the other `*-nome` columns are kept as parent
//! names and the other `*-id` / `*-sigla` columns are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::polygons::{json_to_id, COUNTRY_ID};
use crate::error::{Error, Result};
use crate::models::GeoLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub id: i64,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    /// Parent-level names keyed by their column prefix (`UF`, `regiao`, ...)
    pub parents: BTreeMap<String, String>,
}

impl MetadataRow {
    /// The country has no localidades row matching the mesh id.
    pub fn country() -> Self {
        Self {
            id: COUNTRY_ID,
            name: Some("Brasil".to_string()),
            abbreviation: Some("BR".to_string()),
            parents: BTreeMap::new(),
        }
    }
}

pub fn parse_metadata(body: &str, level: GeoLevel, url: &str) -> Result<Vec<MetadataRow>> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(body).map_err(|e| Error::decode(url, e))?;

    let prefix = level.metadata_prefix();
    let id_key = format!("{prefix}-id");
    let name_key = format!("{prefix}-nome");
    let abbr_key = format!("{prefix}-sigla");

    let mut parsed = Vec::with_capacity(rows.len());

    for row in rows {
        let id = match row.get(&id_key).and_then(json_to_id) {
            Some(id) => id,
            None => {
                warn!("Skipping {} metadata row without '{}'", level, id_key);
                continue;
            }
        };

        let parents = row
            .iter()
            .filter(|(key, _)| key.as_str() != name_key)
            .filter_map(|(key, value)| {
                let parent = key.strip_suffix("-nome")?;
                Some((parent.to_string(), value.as_str()?.to_string()))
            })
            .collect();

        parsed.push(MetadataRow {
            id,
            name: string_field(&row, &name_key),
            abbreviation: string_field(&row, &abbr_key),
            parents,
        });
    }

    Ok(parsed)
}

fn string_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: &str = r#"[
        {"UF-id": 53, "UF-sigla": "DF", "UF-nome": "Distrito Federal",
         "regiao-id": 5, "regiao-sigla": "CO", "regiao-nome": "Centro-Oeste"},
        {"UF-id": "52", "UF-sigla": "GO", "UF-nome": "Goiás",
         "regiao-id": 5, "regiao-sigla": "CO", "regiao-nome": "Centro-Oeste"}
    ]"#;

    #[test]
    fn test_parse_state_rows() {
        let rows = parse_metadata(STATES, GeoLevel::State, "test").unwrap();
        assert_eq!(rows.len(), 2);

        let df = &rows[0];
        assert_eq!(df.id, 53);
        assert_eq!(df.name.as_deref(), Some("Distrito Federal"));
        assert_eq!(df.abbreviation.as_deref(), Some("DF"));
        assert_eq!(df.parents.get("regiao").map(String::as_str), Some("Centro-Oeste"));
        assert!(!df.parents.contains_key("UF"));

        assert_eq!(rows[1].id, 52);
    }

    #[test]
    fn test_prefix_does_not_match_longer_columns() {
        let body = r#"[{
            "regiao-imediata-id": 530001, "regiao-imediata-nome": "Distrito Federal",
            "regiao-intermediaria-id": 5301, "regiao-intermediaria-nome": "Distrito Federal",
            "UF-id": 53, "UF-nome": "Distrito Federal",
            "regiao-id": 5, "regiao-nome": "Centro-Oeste"
        }]"#;

        let rows = parse_metadata(body, GeoLevel::Region, "test").unwrap();
        assert_eq!(rows[0].id, 5);
        assert_eq!(rows[0].name.as_deref(), Some("Centro-Oeste"));

        let rows = parse_metadata(body, GeoLevel::ImmediateRegion, "test").unwrap();
        assert_eq!(rows[0].id, 530001);
        assert_eq!(rows[0].abbreviation, None);
        assert_eq!(
            rows[0].parents.get("regiao-intermediaria").map(String::as_str),
            Some("Distrito Federal")
        );
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let body = r#"[{"municipio-nome": "Sem código"}, {"municipio-id": 5300108, "municipio-nome": "Brasília"}]"#;
        let rows = parse_metadata(body, GeoLevel::Municipality, "test").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("Brasília"));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_metadata("{}", GeoLevel::State, "test"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_country_row() {
        let row = MetadataRow::country();
        assert_eq!(row.id, COUNTRY_ID);
        assert_eq!(row.abbreviation.as_deref(), Some("BR"));
    }
}
