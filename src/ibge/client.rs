//! Blocking client for the IBGE mesh and localidades APIs.

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::layer::BoundaryLayer;
use super::metadata::{parse_metadata, MetadataRow};
use super::polygons::{parse_feature_collection, PolygonRecord};
use super::request::FetchRequest;
use super::BoundarySource;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::GeoLevel;

const GEOJSON_FORMAT: &str = "application/vnd.geo+json";

/// Fetches boundary polygons and metadata. Every call hits the network.
#[derive(Debug, Clone)]
pub struct IbgeClient {
    http: Client,
    spatial_url: Url,
    metadata_url: Url,
}

impl IbgeClient {
    /// Client against the public IBGE endpoints
    pub fn new() -> Result<Self> {
        Self::from_config(&ApiConfig::default())
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let spatial_url = parse_base(&config.spatial_url)?;
        let metadata_url = parse_base(&config.metadata_url)?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(Error::HttpClient)?;

        Ok(Self {
            http,
            spatial_url,
            metadata_url,
        })
    }

    /// URL of the mesh request, e.g.
    /// `.../malhas/paises/BR?intrarregiao=UF&qualidade=minima&formato=application/vnd.geo+json`
    pub fn polygons_url(&self, request: &FetchRequest) -> Url {
        let mut url = self.spatial_url.clone();
        extend_path(&mut url, &request.scope.path_segments());
        {
            let mut query = url.query_pairs_mut();
            if request.level != GeoLevel::Country {
                query.append_pair("intrarregiao", request.level.spatial_key());
            }
            query
                .append_pair("qualidade", request.quality.api_value())
                .append_pair("formato", GEOJSON_FORMAT);
        }
        url
    }

    pub fn metadata_url(&self, level: GeoLevel) -> Url {
        let mut url = self.metadata_url.clone();
        extend_path(&mut url, &[level.metadata_path()]);
        url.query_pairs_mut().append_pair("view", "nivelado");
        url
    }

    pub fn fetch_polygons(&self, request: &FetchRequest) -> Result<Vec<PolygonRecord>> {
        let url = self.polygons_url(request);
        let body = self.get_text(&url)?;
        let records = parse_feature_collection(&body, request.level, url.as_str())?;
        debug!("Fetched {} {} polygons", records.len(), request.level);
        Ok(records)
    }

    /// Metadata rows for a level. The country level is built in and does not hit the network.
    pub fn fetch_metadata(&self, level: GeoLevel) -> Result<Vec<MetadataRow>> {
        if level == GeoLevel::Country {
            return Ok(vec![MetadataRow::country()]);
        }
        let url = self.metadata_url(level);
        let body = self.get_text(&url)?;
        parse_metadata(&body, level, url.as_str())
    }

    fn get_text(&self, url: &Url) -> Result<String> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| Error::remote(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote(url.as_str(), format!("status {status}")));
        }

        response.text().map_err(|e| Error::remote(url.as_str(), e))
    }
}

impl BoundarySource for IbgeClient {
    fn fetch_layer(&self, request: &FetchRequest) -> Result<BoundaryLayer> {
        info!(
            "Fetching {} boundaries ({} quality, {:?})",
            request.level, request.quality, request.scope
        );
        let polygons = self.fetch_polygons(request)?;
        if polygons.is_empty() {
            return Err(Error::EmptyResult {
                level: request.level,
                quality: request.quality,
            });
        }
        let metadata = self.fetch_metadata(request.level)?;
        BoundaryLayer::join(request.level, request.quality, polygons, metadata)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let invalid = |reason: String| Error::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be a base".to_string()));
    }
    Ok(url)
}

fn extend_path<S: AsRef<str>>(url: &mut Url, segments: &[S]) {
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        for segment in segments {
            path.push(segment.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibge::Scope;
    use crate::models::Quality;

    fn client() -> IbgeClient {
        IbgeClient::new().unwrap()
    }

    /// Serve one canned HTTP response on a local port and return the mesh base URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            reader.get_mut().write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/malhas")
    }

    fn local_client(spatial_url: String) -> IbgeClient {
        let config = ApiConfig {
            spatial_url,
            timeout_secs: Some(5),
            ..ApiConfig::default()
        };
        IbgeClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_polygons_url_for_states() {
        let url = client().polygons_url(&FetchRequest::new(GeoLevel::State, Quality::Low));
        assert_eq!(
            url.as_str(),
            "https://servicodados.ibge.gov.br/api/v3/malhas/paises/BR\
             ?intrarregiao=UF&qualidade=minima&formato=application%2Fvnd.geo%2Bjson"
        );
    }

    #[test]
    fn test_polygons_url_for_country_omits_subdivision() {
        let url = client().polygons_url(&FetchRequest::new(GeoLevel::Country, Quality::High));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.iter().all(|(k, _)| k != "intrarregiao"));
        assert!(pairs.contains(&("qualidade".to_string(), "maxima".to_string())));
    }

    #[test]
    fn test_polygons_url_with_scope() {
        let request =
            FetchRequest::new(GeoLevel::Municipality, Quality::Medium).within(Scope::State(53));
        let url = client().polygons_url(&request);
        assert_eq!(url.path(), "/api/v3/malhas/estados/53");
        assert!(url.query().unwrap().contains("intrarregiao=municipio"));
    }

    #[test]
    fn test_metadata_url() {
        let url = client().metadata_url(GeoLevel::ImmediateRegion);
        assert_eq!(
            url.as_str(),
            "https://servicodados.ibge.gov.br/api/v1/localidades/regioes-imediatas?view=nivelado"
        );
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let config = ApiConfig {
            metadata_url: "http://localhost:8080/localidades/".to_string(),
            ..ApiConfig::default()
        };
        let client = IbgeClient::from_config(&config).unwrap();
        assert_eq!(
            client.metadata_url(GeoLevel::State).as_str(),
            "http://localhost:8080/localidades/estados?view=nivelado"
        );
    }

    #[test]
    fn test_country_metadata_is_local() {
        let rows = client().fetch_metadata(GeoLevel::Country).unwrap();
        assert_eq!(rows, vec![MetadataRow::country()]);
    }

    #[test]
    fn test_unreachable_host_is_remote_unavailable() {
        let config = ApiConfig {
            spatial_url: "http://127.0.0.1:9/malhas".to_string(),
            timeout_secs: Some(2),
            ..ApiConfig::default()
        };
        let client = IbgeClient::from_config(&config).unwrap();
        let result = client.fetch_layer(&FetchRequest::new(GeoLevel::State, Quality::Low));
        assert!(matches!(result, Err(Error::RemoteUnavailable { .. })));
    }

    #[test]
    fn test_server_error_is_remote_unavailable() {
        let client = local_client(serve_once("500 Internal Server Error", "{}"));
        let result = client.fetch_layer(&FetchRequest::new(GeoLevel::State, Quality::Low));
        match result {
            Err(Error::RemoteUnavailable { reason, .. }) => assert!(reason.contains("500")),
            other => panic!("expected RemoteUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_collection_is_empty_result() {
        let body = r#"{"type":"FeatureCollection","features":[]}"#;
        let client = local_client(serve_once("200 OK", body));
        let result = client.fetch_layer(&FetchRequest::new(GeoLevel::Municipality, Quality::Medium));
        assert!(matches!(
            result,
            Err(Error::EmptyResult {
                level: GeoLevel::Municipality,
                quality: Quality::Medium,
            })
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            spatial_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            IbgeClient::from_config(&config),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    #[ignore = "requires network access to the IBGE API"]
    fn test_fetch_regions_from_ibge() {
        let layer = client()
            .fetch_layer(&FetchRequest::new(GeoLevel::Region, Quality::Low))
            .unwrap();
        assert_eq!(layer.len(), 5);
        let names: Vec<_> = layer.units().iter().filter_map(|u| u.name.clone()).collect();
        assert!(names.contains(&"Nordeste".to_string()));
    }
}
