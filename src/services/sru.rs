//! SRU search client
//!
//! Records are looked up with SRU 1.2 `searchRetrieve` requests returning
//! MARCXML. Results are consumed through [`SearchResults`], a forward-only
//! cursor fetching one page at a time.

use std::collections::VecDeque;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{AppError, AppResult};
use crate::marc::xml::{read_record, read_text};
use crate::marc::MarcRecord;

/// Records per request
pub const PAGE_SIZE: usize = 50;

/// The service will not page past this many records
pub const MAX_RECORDS: usize = 10_000;

/// One page of a search response
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub num_records: usize,
    pub records: Vec<MarcRecord>,
    /// 1-based position of the next page, `None` on the last page
    pub next_position: Option<usize>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Fetch the page of results for `query` starting at `start` (1-based)
    async fn search_page(&self, query: &str, start: usize) -> AppResult<SearchPage>;
}

/// Lazy, forward-only sequence of search results
pub struct SearchResults<'a> {
    service: &'a dyn SearchService,
    query: String,
    buffer: VecDeque<MarcRecord>,
    next_position: Option<usize>,
    num_records: Option<usize>,
}

impl<'a> SearchResults<'a> {
    pub fn new(service: &'a dyn SearchService, query: impl Into<String>) -> Self {
        Self {
            service,
            query: query.into(),
            buffer: VecDeque::new(),
            next_position: Some(1),
            num_records: None,
        }
    }

    /// Total number of results, known once the first page is fetched
    pub fn num_records(&self) -> Option<usize> {
        self.num_records
    }

    /// Next record, fetching a new page when needed
    pub async fn next(&mut self) -> AppResult<Option<MarcRecord>> {
        if self.buffer.is_empty() {
            let Some(start) = self.next_position else {
                return Ok(None);
            };
            let page = self.service.search_page(&self.query, start).await?;
            if self.num_records.is_none() {
                tracing::debug!("Search returned {} records", page.num_records);
                if page.num_records > MAX_RECORDS {
                    self.next_position = None;
                    return Err(AppError::TooManyResults(page.num_records));
                }
                self.num_records = Some(page.num_records);
            }
            // guard against services repeating the same page
            self.next_position = page.next_position.filter(|next| *next > start);
            self.buffer.extend(page.records);
        }
        Ok(self.buffer.pop_front())
    }
}

/// SRU client for an Alma institution zone
#[derive(Clone)]
pub struct SruClient {
    http: reqwest::Client,
    url: String,
}

impl SruClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SearchService for SruClient {
    async fn search_page(&self, query: &str, start: usize) -> AppResult<SearchPage> {
        tracing::debug!("SRU request: {} (start {})", query, start);
        let start = start.to_string();
        let maximum = PAGE_SIZE.to_string();
        let body = self
            .http
            .get(&self.url)
            .query(&[
                ("version", "1.2"),
                ("operation", "searchRetrieve"),
                ("recordSchema", "marcxml"),
                ("maximumRecords", maximum.as_str()),
                ("startRecord", start.as_str()),
                ("query", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_response(&body)
    }
}

/// Parse an SRU `searchRetrieveResponse`
pub fn parse_response(xml: &str) -> AppResult<SearchPage> {
    let mut reader = Reader::from_str(xml);
    let mut page = SearchPage::default();
    let mut in_record_data = false;
    let mut diagnostics: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"numberOfRecords" => {
                    page.num_records = parse_number(&read_text(&mut reader)?)?;
                }
                b"nextRecordPosition" => {
                    page.next_position = Some(parse_number(&read_text(&mut reader)?)?);
                }
                b"recordData" => in_record_data = true,
                b"record" if in_record_data => {
                    page.records.push(read_record(&mut reader)?);
                    in_record_data = false;
                }
                b"message" | b"details" => {
                    let text = read_text(&mut reader)?;
                    if !text.trim().is_empty() {
                        diagnostics.push(text.trim().to_string());
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"recordData" => in_record_data = false,
            Event::Eof => break,
            _ => {}
        }
    }

    if !diagnostics.is_empty() {
        return Err(AppError::SruDiagnostic(diagnostics.join(": ")));
    }
    Ok(page)
}

fn parse_number(text: &str) -> AppResult<usize> {
    text.trim()
        .parse()
        .map_err(|_| AppError::Xml(format!("expected a number, got \"{}\"", text.trim())))
}
