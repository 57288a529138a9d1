use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

use super::{GeocodeError, Geocoder};
use crate::config::GeocoderConfig;
use crate::domain::{CityCoordinate, CityRef};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const USER_AGENT: &str = concat!("travelmap/", env!("CARGO_PKG_VERSION"), " (travel map generator)");

/// One search candidate; Nominatim sends coordinates as strings
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimResult {
    #[serde(rename = "type", default)]
    pub type_: String,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

/// First candidate whose `type` is one of the accepted place types
pub fn select_match<'a>(
    results: &'a [NominatimResult],
    accepted_types: &[String],
) -> Option<&'a NominatimResult> {
    results
        .iter()
        .find(|r| accepted_types.iter().any(|t| *t == r.type_))
}

/// Turn a raw search response body into a coordinate
///
/// The raw body is kept in the `NotFound` error so an unmatched query can be
/// looked at by hand.
pub fn interpret_response(
    query: &str,
    body: &str,
    accepted_types: &[String],
) -> Result<CityCoordinate, GeocodeError> {
    let results: Vec<NominatimResult> =
        serde_json::from_str(body).map_err(|source| GeocodeError::Parse {
            query: query.to_string(),
            source,
        })?;

    let Some(result) = select_match(&results, accepted_types) else {
        return Err(GeocodeError::NotFound {
            query: query.to_string(),
            raw: body.to_string(),
        });
    };

    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GeocodeError::InvalidCoordinate {
                query: query.to_string(),
                value: value.to_string(),
            })
    };

    Ok(CityCoordinate::new(parse(&result.lon)?, parse(&result.lat)?))
}

/// Blocking Nominatim search client
///
/// Requests go out one at a time; consecutive requests are spaced by at least
/// `request_interval` (Nominatim allows one request per second).
pub struct NominatimClient {
    client: reqwest::blocking::Client,
    url: String,
    accepted_types: Vec<String>,
    request_interval: Duration,
    last_request: Option<Instant>,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GeocodeError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
            accepted_types: config.accepted_types.clone(),
            request_interval: Duration::from_millis(config.request_interval_ms),
            last_request: None,
        })
    }

    fn wait_turn(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.request_interval {
                thread::sleep(self.request_interval - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn search(&mut self, query: &str) -> Result<String, GeocodeError> {
        self.wait_turn();
        log::debug!("Geocoding \"{}\" via {}", query, self.url);

        let request_error = |source| GeocodeError::Request {
            query: query.to_string(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status {
                query: query.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().map_err(request_error)
    }
}

impl Geocoder for NominatimClient {
    fn geocode(&mut self, city: &CityRef) -> Result<CityCoordinate, GeocodeError> {
        let query = city.query();
        let body = self.search(&query)?;
        interpret_response(&query, &body, &self.accepted_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_accepted_types;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Answer one HTTP request with `status` and `body`; the handle yields the request head
    fn serve_once(status: &str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/search", listener.local_addr().unwrap());
        let status = status.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            while reader.read_line(&mut head).unwrap() > 0 && !head.ends_with("\r\n\r\n") {}
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            head
        });

        (url, handle)
    }

    fn client_for(url: String) -> NominatimClient {
        NominatimClient::new(&GeocoderConfig {
            url,
            request_interval_ms: 0,
            timeout_secs: 5,
            ..GeocoderConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_client_resolves_city() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"lat":"1","lon":"1","type":"suburb"},{"lat":"48.85","lon":"2.35","type":"city"}]"#,
        );
        let mut client = client_for(url);

        let coordinate = client.geocode(&CityRef::new("Paris", "France")).unwrap();

        assert_eq!(coordinate, CityCoordinate::new(2.35, 48.85));
        let head = server.join().unwrap();
        assert!(head.starts_with("GET /search?q=Paris%2C+France&format=json HTTP/1.1\r\n"));
        assert!(head.to_lowercase().contains("user-agent: travelmap/"));
    }

    #[test]
    fn test_client_fails_on_error_status() {
        let (url, server) = serve_once("429 Too Many Requests", "[]");
        let mut client = client_for(url);

        let err = client.geocode(&CityRef::new("Paris", "France")).unwrap_err();

        match err {
            GeocodeError::Status { query, status } => {
                assert_eq!(query, "Paris, France");
                assert_eq!(status, 429);
            }
            other => panic!("unexpected error: {other}"),
        }
        let head = server.join().unwrap();
        assert!(head.starts_with("GET /search?q=Paris%2C+France&format=json HTTP/1.1\r\n"));
        assert!(head.to_lowercase().contains("user-agent: travelmap/"));
    }

    #[test]
    fn test_parse_nominatim_response() {
        let json = r#"[{"place_id":1,"lat":"48.8588897","lon":"2.3200410","type":"administrative","display_name":"Paris, Île-de-France, France"}]"#;
        let results: Vec<NominatimResult> = serde_json::from_str(json).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].type_, "administrative");
        assert_eq!(results[0].lat, "48.8588897");
        assert_eq!(results[0].lon, "2.3200410");
    }

    #[test]
    fn test_first_accepted_type_wins() {
        let json = r#"[
            {"lat":"1","lon":"1","type":"suburb"},
            {"lat":"48.85","lon":"2.35","type":"city"},
            {"lat":"3","lon":"3","type":"town"}
        ]"#;

        let coordinate = interpret_response("Paris, France", json, &default_accepted_types()).unwrap();

        assert_eq!(coordinate, CityCoordinate::new(2.35, 48.85));
    }

    #[test]
    fn test_no_accepted_type_is_not_found() {
        let json = r#"[{"lat":"48.85","lon":"2.35","type":"suburb"}]"#;

        let err = interpret_response("Belleville, France", json, &default_accepted_types()).unwrap_err();

        match err {
            GeocodeError::NotFound { query, raw } => {
                assert_eq!(query, "Belleville, France");
                assert_eq!(raw, json);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_response_is_not_found() {
        let err = interpret_response("Atlantis, Greece", "[]", &default_accepted_types()).unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound { .. }));
    }

    #[test]
    fn test_garbage_response_is_parse_error() {
        let err = interpret_response("Paris, France", "<html>", &default_accepted_types()).unwrap_err();
        assert!(matches!(err, GeocodeError::Parse { .. }));
    }

    #[test]
    fn test_unparsable_coordinate() {
        let json = r#"[{"lat":"north","lon":"2.35","type":"town"}]"#;
        let err = interpret_response("Nowhere, France", json, &default_accepted_types()).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { ref value, .. } if value == "north"));
    }
}
