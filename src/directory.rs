use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
}

#[async_trait]
pub trait CountryDirectory: Send + Sync {
    async fn countries(&self) -> AppResult<Vec<Country>>;
    async fn country_code(&self, name: &str) -> AppResult<Option<String>>;
    async fn subregion(&self, code: &str) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait SubdivisionDirectory: Send + Sync {
    async fn states(&self, country: &str) -> AppResult<Vec<String>>;
    async fn cities(&self, country: &str, state: &str) -> AppResult<Vec<String>>;
}

#[async_trait]
pub trait TownDirectory: Send + Sync {
    async fn towns(&self, country: &str, region: &str, city: &str) -> AppResult<Vec<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoTownDirectory;

#[async_trait]
impl TownDirectory for NoTownDirectory {
    async fn towns(&self, country: &str, region: &str, city: &str) -> AppResult<Vec<String>> {
        trace!(country, region, city, "town lookup not available");
        Ok(Vec::new())
    }
}

#[derive(Clone)]
pub struct LocationDirectory {
    countries: Arc<dyn CountryDirectory>,
    subdivisions: Arc<dyn SubdivisionDirectory>,
    towns: Arc<dyn TownDirectory>,
}

impl LocationDirectory {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = build_http_client(config)?;
        Ok(Self::from_parts(
            Arc::new(RestCountriesClient::new(
                http.clone(),
                &config.countries_api_base,
            )?),
            Arc::new(CountriesNowClient::new(http, &config.subdivisions_api_base)?),
        ))
    }

    pub fn from_parts(
        countries: Arc<dyn CountryDirectory>,
        subdivisions: Arc<dyn SubdivisionDirectory>,
    ) -> Self {
        Self {
            countries,
            subdivisions,
            towns: Arc::new(NoTownDirectory),
        }
    }

    pub fn with_towns(mut self, towns: Arc<dyn TownDirectory>) -> Self {
        self.towns = towns;
        self
    }

    pub async fn countries(&self) -> AppResult<Vec<Country>> {
        let mut countries = self.countries.countries().await?;
        countries.retain(|c| !c.name.trim().is_empty());
        countries.sort_by_cached_key(|c| c.name.to_lowercase());
        Ok(countries)
    }

    /// States for `country`; when that lookup fails or comes back empty, a
    /// single coarse subregion entry resolved through the country code.
    /// Both sources failing yields an empty list, not an error.
    pub async fn regions(&self, country: &str) -> AppResult<Vec<String>> {
        match self.subdivisions.states(country).await {
            Ok(states) if !states.is_empty() => return Ok(tidy_names(states)),
            Ok(_) => debug!(country, "no states listed; trying subregion fallback"),
            Err(err) => warn!(?err, country, "state lookup failed; trying subregion fallback"),
        }

        match self.subregion_fallback(country).await {
            Ok(Some(subregion)) => Ok(vec![subregion]),
            Ok(None) => Ok(Vec::new()),
            Err(err) => {
                warn!(?err, country, "subregion fallback failed");
                Ok(Vec::new())
            }
        }
    }

    pub async fn cities(&self, country: &str, region: &str) -> AppResult<Vec<String>> {
        self.subdivisions
            .cities(country, region)
            .await
            .map(tidy_names)
    }

    pub async fn towns(&self, country: &str, region: &str, city: &str) -> AppResult<Vec<String>> {
        self.towns.towns(country, region, city).await.map(tidy_names)
    }

    async fn subregion_fallback(&self, country: &str) -> AppResult<Option<String>> {
        let Some(code) = self.countries.country_code(country).await? else {
            return Ok(None);
        };
        let subregion = self.countries.subregion(&code).await?;
        Ok(subregion.filter(|value| !value.trim().is_empty()))
    }
}

fn tidy_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

pub(crate) fn build_http_client(config: &AppConfig) -> AppResult<Client> {
    Ok(Client::builder()
        .user_agent(config.user_agent())
        .timeout(config.http_timeout())
        .build()?)
}

pub(crate) fn parse_base(base: &str) -> AppResult<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|err| AppError::Config(format!("invalid API base {base}: {err}")))
}

pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> AppResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::Config(format!("API base cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub struct RestCountriesClient {
    http: Client,
    base: Url,
}

impl RestCountriesClient {
    pub fn new(http: Client, base: &str) -> AppResult<Self> {
        Ok(Self {
            http,
            base: parse_base(base)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountryName {
    Plain(String),
    Structured { common: String },
}

impl CountryName {
    fn into_string(self) -> String {
        match self {
            CountryName::Plain(name) => name,
            CountryName::Structured { common } => common,
        }
    }
}

#[derive(Deserialize)]
struct CountryRecord {
    name: CountryName,
    #[serde(alias = "cca2")]
    code: Option<String>,
}

#[derive(Deserialize)]
struct CodeRecord {
    #[serde(alias = "cca2")]
    code: Option<String>,
}

#[derive(Deserialize)]
struct SubregionRecord {
    subregion: Option<String>,
    region: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[async_trait]
impl CountryDirectory for RestCountriesClient {
    async fn countries(&self) -> AppResult<Vec<Country>> {
        let mut url = endpoint(&self.base, &["all"])?;
        url.query_pairs_mut().append_pair("fields", "name,cca2");

        let records: Vec<CountryRecord> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records
            .into_iter()
            .map(|record| Country {
                name: record.name.into_string(),
                code: record.code.unwrap_or_default(),
            })
            .collect())
    }

    async fn country_code(&self, name: &str) -> AppResult<Option<String>> {
        let mut url = endpoint(&self.base, &["name", name])?;
        url.query_pairs_mut()
            .append_pair("fullText", "true")
            .append_pair("fields", "cca2");

        let records: OneOrMany<CodeRecord> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records
            .first()
            .and_then(|record| record.code)
            .filter(|code| !code.trim().is_empty()))
    }

    async fn subregion(&self, code: &str) -> AppResult<Option<String>> {
        let mut url = endpoint(&self.base, &["alpha", code])?;
        url.query_pairs_mut()
            .append_pair("fields", "subregion,region");

        let records: OneOrMany<SubregionRecord> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records.first().and_then(|record| {
            record
                .subregion
                .filter(|value| !value.trim().is_empty())
                .or(record.region)
        }))
    }
}

pub struct CountriesNowClient {
    http: Client,
    base: Url,
}

impl CountriesNowClient {
    pub fn new(http: Client, base: &str) -> AppResult<Self> {
        Ok(Self {
            http,
            base: parse_base(base)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameEntry {
    Plain(String),
    Named { name: String },
}

impl NameEntry {
    fn into_name(self) -> String {
        match self {
            NameEntry::Plain(name) => name,
            NameEntry::Named { name } => name,
        }
    }
}

#[derive(Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Vec<NameEntry>,
    #[serde(default)]
    data: Option<StatesData>,
}

#[derive(Deserialize)]
struct StatesData {
    #[serde(default)]
    states: Vec<NameEntry>,
}

#[derive(Deserialize)]
struct CitiesResponse {
    #[serde(default)]
    cities: Vec<NameEntry>,
    #[serde(default)]
    data: Option<CitiesData>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CitiesData {
    List(Vec<NameEntry>),
    Nested {
        #[serde(default)]
        cities: Vec<NameEntry>,
    },
}

#[async_trait]
impl SubdivisionDirectory for CountriesNowClient {
    async fn states(&self, country: &str) -> AppResult<Vec<String>> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            country: &'a str,
        }

        let url = endpoint(&self.base, &["countries", "states"])?;
        let response: StatesResponse = self
            .http
            .post(url)
            .json(&RequestBody { country })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let entries = match response.data {
            Some(data) if response.states.is_empty() => data.states,
            _ => response.states,
        };
        Ok(entries.into_iter().map(NameEntry::into_name).collect())
    }

    async fn cities(&self, country: &str, state: &str) -> AppResult<Vec<String>> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            country: &'a str,
            state: &'a str,
        }

        let url = endpoint(&self.base, &["countries", "state", "cities"])?;
        let response: CitiesResponse = self
            .http
            .post(url)
            .json(&RequestBody { country, state })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let entries = match response.data {
            Some(CitiesData::List(list)) if response.cities.is_empty() => list,
            Some(CitiesData::Nested { cities }) if response.cities.is_empty() => cities,
            _ => response.cities,
        };
        Ok(entries.into_iter().map(NameEntry::into_name).collect())
    }
}

#[cfg(test)]
mod tests {
    use httptest::matchers::{all_of, request};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    fn client() -> Client {
        build_http_client(&AppConfig::default()).unwrap()
    }

    fn base(server: &Server) -> String {
        server.url_str("")
    }

    #[derive(Default)]
    struct FakeCountries {
        code: Option<String>,
        subregion: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CountryDirectory for FakeCountries {
        async fn countries(&self) -> AppResult<Vec<Country>> {
            Ok(vec![
                Country {
                    name: "togo".into(),
                    code: "TG".into(),
                },
                Country {
                    name: "Ghana".into(),
                    code: "GH".into(),
                },
                Country {
                    name: "Benin".into(),
                    code: "BJ".into(),
                },
            ])
        }

        async fn country_code(&self, name: &str) -> AppResult<Option<String>> {
            self.calls.lock().push(format!("code:{name}"));
            Ok(self.code.clone())
        }

        async fn subregion(&self, code: &str) -> AppResult<Option<String>> {
            self.calls.lock().push(format!("subregion:{code}"));
            Ok(self.subregion.clone())
        }
    }

    struct FakeSubdivisions {
        states: AppResult<Vec<String>>,
    }

    #[async_trait]
    impl SubdivisionDirectory for FakeSubdivisions {
        async fn states(&self, _country: &str) -> AppResult<Vec<String>> {
            match &self.states {
                Ok(states) => Ok(states.clone()),
                Err(err) => Err(AppError::Lookup(err.to_string())),
            }
        }

        async fn cities(&self, _country: &str, _state: &str) -> AppResult<Vec<String>> {
            Ok(vec![" Accra ".into(), "Tema".into(), "Accra".into(), "".into()])
        }
    }

    fn directory(
        states: AppResult<Vec<String>>,
        countries: FakeCountries,
    ) -> (LocationDirectory, Arc<FakeCountries>) {
        let countries = Arc::new(countries);
        let directory = LocationDirectory::from_parts(
            countries.clone(),
            Arc::new(FakeSubdivisions { states }),
        );
        (directory, countries)
    }

    #[tokio::test]
    async fn sorts_countries_case_insensitively() {
        let (directory, _) = directory(Ok(Vec::new()), FakeCountries::default());
        let names = directory
            .countries()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Benin", "Ghana", "togo"]);
    }

    #[tokio::test]
    async fn uses_states_when_available() {
        let (directory, countries) = directory(
            Ok(vec!["Ashanti".into(), "Greater Accra".into()]),
            FakeCountries::default(),
        );
        let regions = directory.regions("Ghana").await.unwrap();
        assert_eq!(regions, vec!["Ashanti", "Greater Accra"]);
        assert!(countries.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_subregion_when_states_fail() {
        let (directory, countries) = directory(
            Err(AppError::Lookup("down".into())),
            FakeCountries {
                code: Some("GH".into()),
                subregion: Some("Western Africa".into()),
                ..FakeCountries::default()
            },
        );
        let regions = directory.regions("Ghana").await.unwrap();
        assert_eq!(regions, vec!["Western Africa"]);
        assert_eq!(
            *countries.calls.lock(),
            vec!["code:Ghana".to_string(), "subregion:GH".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_when_both_sources_have_nothing() {
        let (directory, countries) = directory(Ok(Vec::new()), FakeCountries::default());
        assert!(directory.regions("Atlantis").await.unwrap().is_empty());
        assert_eq!(*countries.calls.lock(), vec!["code:Atlantis".to_string()]);
    }

    #[tokio::test]
    async fn tidies_city_names_and_towns_default_to_empty() {
        let (directory, _) = directory(Ok(Vec::new()), FakeCountries::default());
        let cities = directory.cities("Ghana", "Greater Accra").await.unwrap();
        assert_eq!(cities, vec!["Accra", "Tema"]);
        assert!(directory
            .towns("Ghana", "Greater Accra", "Accra")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rest_countries_client_parses_both_shapes() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of!(request::method("GET"), request::path("/all")))
                .respond_with(json_encoded(json!([
                    { "name": { "common": "Ghana", "official": "Republic of Ghana" }, "cca2": "GH" },
                    { "name": "Togo", "code": "TG" }
                ]))),
        );
        server.expect(
            Expectation::matching(all_of!(
                request::method("GET"),
                request::path("/name/Ghana")
            ))
            .respond_with(json_encoded(json!([{ "cca2": "GH" }]))),
        );
        server.expect(
            Expectation::matching(all_of!(request::method("GET"), request::path("/alpha/GH")))
                .respond_with(json_encoded(json!({ "subregion": "Western Africa", "region": "Africa" }))),
        );

        let client = RestCountriesClient::new(client(), &base(&server)).unwrap();
        let countries = client.countries().await.unwrap();
        assert_eq!(
            countries,
            vec![
                Country {
                    name: "Ghana".into(),
                    code: "GH".into()
                },
                Country {
                    name: "Togo".into(),
                    code: "TG".into()
                },
            ]
        );
        assert_eq!(client.country_code("Ghana").await.unwrap().as_deref(), Some("GH"));
        assert_eq!(
            client.subregion("GH").await.unwrap().as_deref(),
            Some("Western Africa")
        );
    }

    #[tokio::test]
    async fn countries_now_client_reads_enveloped_and_flat_payloads() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of!(
                request::method("POST"),
                request::path("/countries/states")
            ))
            .respond_with(json_encoded(json!({
                "error": false,
                "data": { "name": "Ghana", "states": [{ "name": "Ashanti" }, { "name": "Greater Accra" }] }
            }))),
        );
        server.expect(
            Expectation::matching(all_of!(
                request::method("POST"),
                request::path("/countries/state/cities")
            ))
            .respond_with(json_encoded(json!({ "cities": ["Accra", { "name": "Tema" }] }))),
        );

        let client = CountriesNowClient::new(client(), &base(&server)).unwrap();
        assert_eq!(
            client.states("Ghana").await.unwrap(),
            vec!["Ashanti", "Greater Accra"]
        );
        assert_eq!(
            client.cities("Ghana", "Greater Accra").await.unwrap(),
            vec!["Accra", "Tema"]
        );
    }

    #[tokio::test]
    async fn countries_now_errors_surface_as_failures() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::path("/countries/states")).respond_with(
                status_code(404).body(r#"{"error":true,"msg":"country not found"}"#),
            ),
        );

        let client = CountriesNowClient::new(client(), &base(&server)).unwrap();
        assert!(client.states("Atlantis").await.is_err());
    }

    #[test]
    fn endpoint_keeps_the_base_path() {
        let base = parse_base("https://countriesnow.space/api/v0.1/").unwrap();
        let url = endpoint(&base, &["countries", "states"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://countriesnow.space/api/v0.1/countries/states"
        );
    }
}
