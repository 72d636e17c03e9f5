//! Google Places collector.
//!
//! One text search for `restaurants {city}` (first result page only), then a
//! place details call per result to pick up contact data and reviews. A
//! failed details call keeps the search result without reviews.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, info_span, warn};

use reviewflow_model::{Contact, Coordinates, DataSource, RestaurantRecord, ReviewRecord};

use crate::collector::{CollectedBatch, Collector};
use crate::error::AdapterError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";

const PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between details calls to stay under the per-second quota.
const DETAILS_PAUSE: Duration = Duration::from_millis(100);

const DETAILS_FIELDS: &str = "place_id,name,rating,user_ratings_total,reviews,\
formatted_address,geometry,types,price_level,formatted_phone_number,website";

/// Collector backed by the Places web service.
pub struct GooglePlacesCollector {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl GooglePlacesCollector {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AdapterError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AdapterError::MissingApiKey(API_KEY_ENV));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: PLACES_BASE_URL.to_string(),
            language: "fr".to_string(),
        })
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, AdapterError> {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, AdapterError> {
        let url = format!("{}/{endpoint}/json", self.base_url);
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("language", self.language.as_str()));
        query.push(("key", self.api_key.as_str()));
        let url = Url::parse_with_params(&url, &query)
            .map_err(|e| AdapterError::InvalidUrl(e.to_string()))?;

        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(AdapterError::Http {
                status: response.status().as_u16(),
                endpoint,
            });
        }
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| AdapterError::Parse(e.to_string()))
    }

    fn search(&self, city: &str) -> Result<Vec<PlaceResult>, AdapterError> {
        let query = format!("restaurants {city}");
        let response: SearchResponse =
            self.get("textsearch", &[("query", query.as_str()), ("type", "restaurant")])?;
        check_status(&response.status, response.error_message.as_deref())?;
        Ok(response.results)
    }

    fn details(&self, place_id: &str) -> Result<PlaceResult, AdapterError> {
        let response: DetailsResponse = self.get(
            "details",
            &[("place_id", place_id), ("fields", DETAILS_FIELDS)],
        )?;
        check_status(&response.status, response.error_message.as_deref())?;
        Ok(response.result.unwrap_or_default())
    }
}

impl Collector for GooglePlacesCollector {
    fn collect(&self, city: &str, max_results: usize) -> Result<CollectedBatch, AdapterError> {
        let span = info_span!("google_places", city = %city, max_results);
        let _guard = span.enter();

        let mut places = self.search(city)?;
        places.truncate(max_results);
        info!(found = places.len(), "text search complete");

        let mut batch = CollectedBatch::new(city);
        for (index, place) in places.into_iter().enumerate() {
            let place = match place.place_id.clone() {
                Some(id) => {
                    if index > 0 {
                        thread::sleep(DETAILS_PAUSE);
                    }
                    match self.details(&id) {
                        Ok(details) => place.merge(details),
                        Err(e) => {
                            warn!(place_id = %id, error = %e, "details failed, keeping search result");
                            place
                        }
                    }
                }
                None => place,
            };
            let (restaurant, reviews) = place.into_records(batch.collected_at);
            debug!(name = %restaurant.name, reviews = reviews.len(), "collected place");
            batch.restaurants.push(restaurant);
            batch.reviews.extend(reviews);
        }

        info!(
            restaurants = batch.restaurants.len(),
            reviews = batch.reviews.len(),
            "collection complete"
        );
        Ok(batch)
    }
}

fn check_status(status: &str, message: Option<&str>) -> Result<(), AdapterError> {
    let message = message.unwrap_or_default().to_string();
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" => Err(AdapterError::QuotaExceeded(message)),
        "REQUEST_DENIED" => Err(AdapterError::RequestDenied(message)),
        other => Err(AdapterError::Api {
            status: other.to_string(),
            message,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlaceResult {
    place_id: Option<String>,
    name: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    price_level: Option<u8>,
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
    types: Vec<String>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    reviews: Vec<PlaceReview>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlaceReview {
    author_name: String,
    rating: Option<i64>,
    text: String,
    relative_time_description: String,
    time: Option<i64>,
}

impl PlaceResult {
    /// Details fields win over search fields when present.
    fn merge(self, details: PlaceResult) -> PlaceResult {
        PlaceResult {
            place_id: details.place_id.or(self.place_id),
            name: details.name.or(self.name),
            rating: details.rating.or(self.rating),
            user_ratings_total: details.user_ratings_total.or(self.user_ratings_total),
            price_level: details.price_level.or(self.price_level),
            formatted_address: details.formatted_address.or(self.formatted_address),
            geometry: details.geometry.or(self.geometry),
            types: if details.types.is_empty() {
                self.types
            } else {
                details.types
            },
            formatted_phone_number: details
                .formatted_phone_number
                .or(self.formatted_phone_number),
            website: details.website.or(self.website),
            reviews: details.reviews,
        }
    }

    fn into_records(self, collected_at: DateTime<Utc>) -> (RestaurantRecord, Vec<ReviewRecord>) {
        let name = self.name.unwrap_or_default();
        let contact = (self.formatted_phone_number.is_some() || self.website.is_some()).then(|| {
            Contact {
                phone: self.formatted_phone_number,
                website: self.website,
            }
        });
        let reviews = self
            .reviews
            .into_iter()
            .map(|review| ReviewRecord {
                place_id: self.place_id.clone(),
                restaurant_name: name.clone(),
                author: review.author_name,
                rating: review.rating,
                text: review.text,
                relative_time: review.relative_time_description,
                published_at: review
                    .time
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
                collected_at,
                source: DataSource::GooglePlaces,
            })
            .collect();
        let restaurant = RestaurantRecord {
            place_id: self.place_id,
            name,
            rating: self.rating,
            review_count: self.user_ratings_total.unwrap_or_default(),
            price_level: self.price_level,
            address: self.formatted_address.unwrap_or_default(),
            coordinates: self.geometry.map(|geometry| Coordinates {
                latitude: geometry.location.lat,
                longitude: geometry.location.lng,
            }),
            categories: self.types.into_iter().collect(),
            contact,
            collected_at,
            source: DataSource::GooglePlaces,
        };
        (restaurant, reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS_FIXTURE: &str = r#"{
        "status": "OK",
        "result": {
            "place_id": "ChIJ1",
            "name": "Le Comptoir",
            "rating": 4.6,
            "user_ratings_total": 812,
            "price_level": 2,
            "formatted_address": "9 Carrefour de l'Odéon, Paris",
            "geometry": { "location": { "lat": 48.85, "lng": 2.33 } },
            "types": ["restaurant", "food"],
            "website": "https://example.com",
            "reviews": [
                {
                    "author_name": "Camille",
                    "rating": 5,
                    "text": "Excellent repas",
                    "relative_time_description": "il y a une semaine",
                    "time": 1700000000
                },
                { "author_name": "Jules", "rating": 3 }
            ]
        }
    }"#;

    #[test]
    fn details_convert_to_records() {
        let response: DetailsResponse = serde_json::from_str(DETAILS_FIXTURE).unwrap();
        let collected_at = DateTime::from_timestamp(1_700_100_000, 0).unwrap();

        let (restaurant, reviews) = response.result.unwrap().into_records(collected_at);

        assert_eq!(restaurant.place_id.as_deref(), Some("ChIJ1"));
        assert_eq!(restaurant.review_count, 812);
        assert_eq!(restaurant.categories.len(), 2);
        let contact = restaurant.contact.unwrap();
        assert_eq!(contact.phone, None);
        assert_eq!(contact.website.as_deref(), Some("https://example.com"));
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].restaurant_name, "Le Comptoir");
        assert_eq!(
            reviews[0].published_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(reviews[1].text, "");
        assert_eq!(reviews[1].source, DataSource::GooglePlaces);
    }

    #[test]
    fn details_override_search_fields() {
        let search = PlaceResult {
            place_id: Some("p".to_string()),
            name: Some("Search Name".to_string()),
            rating: Some(4.0),
            types: vec!["restaurant".to_string()],
            ..PlaceResult::default()
        };
        let details = PlaceResult {
            rating: Some(4.2),
            ..PlaceResult::default()
        };

        let merged = search.merge(details);

        assert_eq!(merged.name.as_deref(), Some("Search Name"));
        assert_eq!(merged.rating, Some(4.2));
        assert_eq!(merged.types, vec!["restaurant".to_string()]);
    }

    #[test]
    fn api_status_mapping() {
        assert!(check_status("OK", None).is_ok());
        assert!(check_status("ZERO_RESULTS", None).is_ok());
        assert!(matches!(
            check_status("OVER_QUERY_LIMIT", Some("quota")),
            Err(AdapterError::QuotaExceeded(_))
        ));
        assert!(matches!(
            check_status("REQUEST_DENIED", Some("bad key")),
            Err(AdapterError::RequestDenied(message)) if message == "bad key"
        ));
        assert!(matches!(
            check_status("INVALID_REQUEST", None),
            Err(AdapterError::Api { .. })
        ));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(
            GooglePlacesCollector::new("  "),
            Err(AdapterError::MissingApiKey(API_KEY_ENV))
        ));
    }
}
