//! End-to-end job runs against in-memory collaborators

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use almar::marc::{DataField, MarcRecord, Subfield};
use almar::models::{Action, Concept, Interactivity, Tag};
use almar::services::alma::{Bib, CatalogService};
use almar::services::authorities::AuthorityService;
use almar::services::job::{Job, JobOptions};
use almar::services::prompt::{DefaultsPrompter, Prompter};
use almar::services::sru::{SearchPage, SearchService};
use almar::services::Services;
use almar::{AppError, AppResult};

/// Catalog holding bibs in memory and remembering what was saved
#[derive(Default)]
struct InMemoryCatalog {
    bibs: Mutex<HashMap<String, Bib>>,
    saved: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl InMemoryCatalog {
    fn with(records: Vec<MarcRecord>) -> Self {
        let bibs = records
            .into_iter()
            .map(|r| {
                let id = r.id().unwrap().to_string();
                (id.clone(), Bib::new(id, r))
            })
            .collect();
        Self {
            bibs: Mutex::new(bibs),
            ..Default::default()
        }
    }

    fn record(&self, id: &str) -> MarcRecord {
        self.bibs.lock().unwrap()[id].record.clone()
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn get_record(&self, mms_id: &str) -> AppResult<Bib> {
        self.bibs
            .lock()
            .unwrap()
            .get(mms_id)
            .cloned()
            .ok_or_else(|| AppError::RecordMismatch {
                requested: mms_id.to_string(),
                returned: String::new(),
            })
    }

    async fn put_record(&self, bib: &Bib) -> AppResult<Bib> {
        if self.fail_on.as_deref() == Some(bib.mms_id.as_str()) {
            return Err(AppError::Persist {
                status: 500,
                body: "<error/>".to_string(),
            });
        }
        self.bibs
            .lock()
            .unwrap()
            .insert(bib.mms_id.clone(), bib.clone());
        self.saved.lock().unwrap().push(bib.mms_id.clone());
        Ok(bib.clone())
    }
}

/// Search returning every record of the catalog, in pages of two
struct CatalogSearch {
    catalog: Arc<InMemoryCatalog>,
    order: Vec<String>,
    requests: Mutex<usize>,
}

#[async_trait]
impl SearchService for CatalogSearch {
    async fn search_page(&self, _query: &str, start: usize) -> AppResult<SearchPage> {
        *self.requests.lock().unwrap() += 1;
        let records: Vec<MarcRecord> = self
            .order
            .iter()
            .skip(start - 1)
            .take(2)
            .map(|id| self.catalog.record(id))
            .collect();
        let next = start + records.len();
        Ok(SearchPage {
            num_records: self.order.len(),
            records,
            next_position: (next <= self.order.len()).then_some(next),
        })
    }
}

struct StaticAuthorities;

#[async_trait]
impl AuthorityService for StaticAuthorities {
    async fn authorize_concept(&self, concept: &mut Concept) -> AppResult<()> {
        if concept.term == "Mønstre" {
            concept.set_authority_id("(NoOU-ONR)c000001");
        }
        Ok(())
    }
}

fn subject(subfields: &[(char, &str)]) -> DataField {
    DataField::new(
        "650",
        ' ',
        '7',
        subfields.iter().map(|(c, v)| Subfield::new(*c, *v)).collect(),
    )
}

fn record(id: &str, fields: Vec<DataField>) -> MarcRecord {
    let mut record = MarcRecord::default();
    record.leader = "00000cam a2200000 c 4500".to_string();
    record.control_fields.insert("001".into(), id.into());
    record.data_fields = fields;
    record
}

fn concept(term: &str) -> Concept {
    Concept::new(term, Some("noubomn"), Tag::Topical).unwrap()
}

fn setup(records: Vec<MarcRecord>, fail_on: Option<&str>) -> (Arc<InMemoryCatalog>, Arc<CatalogSearch>, Services) {
    let order = records.iter().map(|r| r.id().unwrap().to_string()).collect();
    let mut catalog = InMemoryCatalog::with(records);
    catalog.fail_on = fail_on.map(String::from);
    let catalog = Arc::new(catalog);
    let search = Arc::new(CatalogSearch {
        catalog: catalog.clone(),
        order,
        requests: Mutex::new(0),
    });
    let prompter: Arc<dyn Prompter> = Arc::new(DefaultsPrompter);
    let services = Services {
        search: search.clone(),
        catalog: catalog.clone(),
        authorities: Arc::new(StaticAuthorities),
        prompter,
    };
    (catalog, search, services)
}

fn options(action: Action, sources: &[&str], targets: &[&str]) -> JobOptions {
    let mut options = JobOptions::new(
        action,
        sources.iter().map(|t| concept(t)).collect(),
        targets.iter().map(|t| concept(t)).collect(),
    );
    options.interactivity = Interactivity::None;
    options
}

#[tokio::test]
async fn rename_updates_headings_and_subdivisions() {
    let (catalog, search, services) = setup(
        vec![
            record("1", vec![subject(&[('a', "Monstre"), ('2', "noubomn")])]),
            record("2", vec![subject(&[('a', "Mønstre"), ('2', "noubomn")])]),
            record(
                "3",
                vec![subject(&[('a', "Sjøen"), ('x', "Monstre"), ('2', "noubomn")])],
            ),
            record(
                "4",
                vec![
                    subject(&[('a', "Monstre"), ('x', "Historie"), ('2', "noubomn")]),
                    subject(&[('a', "Monstre"), ('2', "humord")]),
                ],
            ),
            record("5", vec![subject(&[('a', "Drager"), ('2', "noubomn")])]),
        ],
        None,
    );

    let mut job = Job::new(services, options(Action::Replace, &["Monstre"], &["Mønstre"]))
        .await
        .unwrap();
    assert_eq!(job.steps().len(), 3);
    assert_eq!(
        job.cql_query(),
        "alma.authority_vocabulary=\"noubomn\" AND alma.subjects=\"Monstre\""
    );

    let ids = job.start().await.unwrap();
    assert_eq!(ids, vec!["1", "3", "4"]);
    assert_eq!(*search.requests.lock().unwrap(), 3);
    assert_eq!(*catalog.saved.lock().unwrap(), vec!["1", "3", "4"]);
    assert_eq!(job.report.records_changed, 3);

    assert_eq!(
        catalog.record("1").data_fields[0].to_string(),
        "650 #7 $a Mønstre $2 noubomn $0 (NoOU-ONR)c000001"
    );
    assert_eq!(
        catalog.record("3").data_fields[0].to_string(),
        "650 #7 $a Sjøen $x Mønstre $2 noubomn"
    );
    let four = catalog.record("4");
    assert_eq!(
        four.data_fields[0].to_string(),
        "650 #7 $a Mønstre $x Historie $2 noubomn"
    );
    // other vocabularies are not touched
    assert_eq!(four.data_fields[1].to_string(), "650 #7 $a Monstre $2 humord");
}

#[tokio::test]
async fn delete_then_nothing_left_to_do() {
    let (catalog, _search, services) = setup(
        vec![
            record("1", vec![subject(&[('a', "Monstre"), ('2', "noubomn")])]),
            record("2", vec![subject(&[('a', "Drager"), ('2', "noubomn")])]),
        ],
        None,
    );

    let mut job = Job::new(services.clone(), options(Action::Remove, &["Monstre"], &[]))
        .await
        .unwrap();
    assert_eq!(job.start().await.unwrap(), vec!["1"]);
    assert!(catalog.record("1").data_fields.is_empty());

    let mut again = Job::new(services, options(Action::Remove, &["Monstre"], &[]))
        .await
        .unwrap();
    assert!(again.start().await.unwrap().is_empty());
    assert_eq!(catalog.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_save_stops_the_batch() {
    let (catalog, _search, services) = setup(
        vec![
            record("1", vec![subject(&[('a', "Monstre"), ('2', "noubomn")])]),
            record("2", vec![subject(&[('a', "Monstre"), ('2', "noubomn")])]),
            record("3", vec![subject(&[('a', "Monstre"), ('2', "noubomn")])]),
        ],
        Some("2"),
    );

    let mut job = Job::new(services, options(Action::Remove, &["Monstre"], &[]))
        .await
        .unwrap();
    let err = job.start().await.unwrap_err();
    assert!(matches!(err, AppError::Persist { status: 500, .. }));
    assert_eq!(*catalog.saved.lock().unwrap(), vec!["1"]);
    // record 3 was never touched
    assert_eq!(catalog.record("3").data_fields.len(), 1);
}
