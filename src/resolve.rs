//! Compound name to SMILES through PubChem's PUG REST API.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::PubChemConfig;
use crate::Source;

const PROPERTIES: &str = "CanonicalSMILES,IsomericSMILES,SMILES,ConnectivitySMILES";

/// how PubChem should interpret a name query
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Namespace {
    /// exact synonym match
    Name,
    /// match on the words of the query, for near-miss synonyms
    Word,
}

/// one record of a property table
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Compound {
    #[serde(rename = "CID")]
    pub cid: Option<u64>,
    #[serde(rename = "CanonicalSMILES")]
    pub canonical_smiles: Option<String>,
    #[serde(rename = "ConnectivitySMILES")]
    pub connectivity_smiles: Option<String>,
    #[serde(rename = "IsomericSMILES")]
    pub isomeric_smiles: Option<String>,
    #[serde(rename = "SMILES")]
    pub smiles: Option<String>,
}

impl Compound {
    /// the canonical SMILES, falling back to the isomeric one. PubChem has
    /// renamed these fields, so both spellings are accepted
    pub fn best_smiles(&self) -> Option<&str> {
        [
            &self.canonical_smiles,
            &self.connectivity_smiles,
            &self.isomeric_smiles,
            &self.smiles,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
struct PropertyResponse {
    #[serde(rename = "PropertyTable")]
    property_table: PropertyTable,
}

#[derive(Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<Compound>,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("invalid base URL {0}")]
    BaseUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("PubChem returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// a source of compound records. an empty result means no match
pub trait Lookup {
    fn compounds(
        &self,
        query: &str,
        namespace: Namespace,
    ) -> impl Future<Output = Result<Vec<Compound>, LookupError>> + Send;
}

pub struct PubChem {
    http: reqwest::Client,
    base_url: String,
}

impl PubChem {
    pub fn new(config: &PubChemConfig) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("molpic/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, query: &str, namespace: Namespace) -> Result<Url, LookupError> {
        let bad_base = || LookupError::BaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| bad_base())?;
        url.path_segments_mut()
            .map_err(|_| bad_base())?
            .pop_if_empty()
            .extend(["compound", "name", query, "property", PROPERTIES, "JSON"]);
        if namespace == Namespace::Word {
            url.query_pairs_mut().append_pair("name_type", "word");
        }
        Ok(url)
    }
}

impl Lookup for PubChem {
    async fn compounds(
        &self,
        query: &str,
        namespace: Namespace,
    ) -> Result<Vec<Compound>, LookupError> {
        let url = self.url(query, namespace)?;
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        // PUG REST answers an unknown name with a 404 fault
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let table: PropertyResponse = response.json().await?;
        Ok(table.property_table.properties)
    }
}

/// the outcome of resolving one name. `smiles` is only set when `message` is
/// `"OK"`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolveResult {
    pub query: String,
    pub smiles: Option<String>,
    pub source: Source,
    pub cid: Option<u64>,
    pub message: String,
}

impl ResolveResult {
    pub fn is_ok(&self) -> bool {
        self.smiles.is_some()
    }
}

/// look `name` up by exact name, then by words. lookup failures are folded
/// into the result message
pub async fn resolve_name_to_smiles(
    lookup: &impl Lookup,
    name: &str,
) -> ResolveResult {
    let query = name.trim();
    if query.is_empty() {
        return ResolveResult {
            query: name.to_owned(),
            smiles: None,
            source: Source::None,
            cid: None,
            message: "Empty name provided".to_owned(),
        };
    }

    let found = match lookup.compounds(query, Namespace::Name).await {
        Ok(c) if c.is_empty() => {
            debug!("no exact match for {query:?}, trying word search");
            lookup.compounds(query, Namespace::Word).await
        }
        other => other,
    };

    let result = |smiles: Option<&str>, cid, message: String| ResolveResult {
        query: query.to_owned(),
        smiles: smiles.map(str::to_owned),
        source: Source::PubChem,
        cid,
        message,
    };

    match found {
        Err(e) => {
            warn!("PubChem lookup for {query:?} failed: {e}");
            result(None, None, format!("PubChem resolution error: {e}"))
        }
        Ok(compounds) => match compounds.first() {
            None => result(None, None, "No PubChem match found".to_owned()),
            Some(c) => match c.best_smiles() {
                Some(s) => result(Some(s), c.cid, "OK".to_owned()),
                None => result(
                    None,
                    c.cid,
                    "Matched entry but no structure returned".to_owned(),
                ),
            },
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// canned answers keyed by query and namespace. anything else is an
    /// empty result. every call is recorded
    #[derive(Default)]
    pub(crate) struct FakeLookup {
        pub(crate) answers: HashMap<(String, Namespace), Vec<Compound>>,
        pub(crate) fail: bool,
        pub(crate) calls: Mutex<Vec<(String, Namespace)>>,
    }

    impl FakeLookup {
        pub(crate) fn with(
            mut self,
            query: &str,
            namespace: Namespace,
            cid: u64,
            smiles: &str,
        ) -> Self {
            self.answers.insert(
                (query.to_owned(), namespace),
                vec![Compound {
                    cid: Some(cid),
                    canonical_smiles: Some(smiles.to_owned()),
                    ..Default::default()
                }],
            );
            self
        }
    }

    impl Lookup for FakeLookup {
        async fn compounds(
            &self,
            query: &str,
            namespace: Namespace,
        ) -> Result<Vec<Compound>, LookupError> {
            self.calls.lock().unwrap().push((query.to_owned(), namespace));
            if self.fail {
                return Err(LookupError::Status {
                    status: 503,
                    body: "busy".to_owned(),
                });
            }
            Ok(self
                .answers
                .get(&(query.to_owned(), namespace))
                .cloned()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn empty_name() {
        let lookup = FakeLookup::default();
        let got = resolve_name_to_smiles(&lookup, "   ").await;
        assert_eq!(got.message, "Empty name provided");
        assert_eq!(got.source, Source::None);
        assert!(got.smiles.is_none());
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_match() {
        let lookup = FakeLookup::default().with("ethanol", Namespace::Name, 702, "CCO");
        let got = resolve_name_to_smiles(&lookup, " ethanol ").await;
        assert_eq!(
            got,
            ResolveResult {
                query: "ethanol".to_owned(),
                smiles: Some("CCO".to_owned()),
                source: Source::PubChem,
                cid: Some(702),
                message: "OK".to_owned(),
            }
        );
        assert_eq!(lookup.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_word_search() {
        let lookup = FakeLookup::default().with("caffeine anhydrous", Namespace::Word, 2519, "CN1C=NC2=C1C(=O)N(C(=O)N2C)C");
        let got = resolve_name_to_smiles(&lookup, "caffeine anhydrous").await;
        assert!(got.is_ok());
        assert_eq!(got.cid, Some(2519));
        assert_eq!(
            *lookup.calls.lock().unwrap(),
            vec![
                ("caffeine anhydrous".to_owned(), Namespace::Name),
                ("caffeine anhydrous".to_owned(), Namespace::Word),
            ]
        );
    }

    #[tokio::test]
    async fn no_match() {
        let got = resolve_name_to_smiles(&FakeLookup::default(), "notachemical").await;
        assert_eq!(got.message, "No PubChem match found");
        assert_eq!(got.source, Source::PubChem);
        assert!(!got.is_ok());
    }

    #[tokio::test]
    async fn match_without_structure() {
        let mut lookup = FakeLookup::default();
        lookup.answers.insert(
            ("mystery".to_owned(), Namespace::Name),
            vec![Compound {
                cid: Some(42),
                ..Default::default()
            }],
        );
        let got = resolve_name_to_smiles(&lookup, "mystery").await;
        assert_eq!(got.message, "Matched entry but no structure returned");
        assert_eq!(got.cid, Some(42));
        assert!(got.smiles.is_none());
    }

    #[tokio::test]
    async fn lookup_failure() {
        let lookup = FakeLookup {
            fail: true,
            ..Default::default()
        };
        let got = resolve_name_to_smiles(&lookup, "water").await;
        assert_eq!(got.message, "PubChem resolution error: PubChem returned 503: busy");
        assert!(got.cid.is_none());
        assert!(got.smiles.is_none());
    }

    #[test]
    fn parse_property_table() {
        let json = r#"{"PropertyTable": {"Properties": [
            {"CID": 962, "SMILES": "O", "ConnectivitySMILES": "O"},
            {"CID": 1, "IsomericSMILES": "C[C@H](O)N"}
        ]}}"#;
        let got: PropertyResponse = serde_json::from_str(json).unwrap();
        let props = got.property_table.properties;
        assert_eq!(props[0].cid, Some(962));
        assert_eq!(props[0].best_smiles(), Some("O"));
        assert_eq!(props[1].best_smiles(), Some("C[C@H](O)N"));
    }

    #[test]
    fn url_encoding() {
        let pubchem = PubChem::new(&PubChemConfig::default()).unwrap();
        let got = pubchem.url("acetic acid/x", Namespace::Word).unwrap();
        assert_eq!(
            got.as_str(),
            "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/name/\
             acetic%20acid%2Fx/property/\
             CanonicalSMILES,IsomericSMILES,SMILES,ConnectivitySMILES/JSON\
             ?name_type=word"
        );
        let got = pubchem.url("water", Namespace::Name).unwrap();
        assert!(got.query().is_none());
    }
}
