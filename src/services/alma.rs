//! Alma Bibs API client
//!
//! Records are fetched and saved as Alma bib documents: a `<bib>` element
//! carrying administrative data around a MARCXML `<record>`. Saving
//! re-sends the document as received with only the record replaced.

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{AppError, AppResult};
use crate::marc::xml::{attribute, read_record, read_text, write_record};
use crate::marc::MarcRecord;

/// A bibliographic record as held by Alma
#[derive(Debug, Clone, PartialEq)]
pub struct Bib {
    pub mms_id: String,
    /// Linked to the Network Zone / Community Zone record
    pub linked_to_cz: bool,
    pub record: MarcRecord,
    /// The `<bib>` document as received
    document: String,
}

impl Bib {
    /// A bib with no administrative data besides the identifier
    pub fn new(mms_id: impl Into<String>, record: MarcRecord) -> Self {
        let mms_id = mms_id.into();
        Self {
            document: format!("<bib><mms_id>{}</mms_id><record/></bib>", escape(&mms_id)),
            mms_id,
            linked_to_cz: false,
            record,
        }
    }

    pub fn from_xml(xml: &str) -> AppResult<Self> {
        let mut reader = Reader::from_str(xml);
        let mut depth = 0usize;
        let mut mms_id = None;
        let mut linked_to_cz = false;
        let mut record = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    match (depth, e.local_name().as_ref()) {
                        (1, b"mms_id") => {
                            mms_id = Some(read_text(&mut reader)?.trim().to_string());
                            continue;
                        }
                        (1, b"linked_record_id") => {
                            let kind = attribute(&e, b"type")?;
                            let value = read_text(&mut reader)?;
                            if kind.as_deref() == Some("CZ") && !value.trim().is_empty() {
                                linked_to_cz = true;
                            }
                            continue;
                        }
                        (1, b"record") => {
                            record = Some(read_record(&mut reader)?);
                            continue;
                        }
                        _ => {}
                    }
                    depth += 1;
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self {
            mms_id: mms_id.ok_or_else(|| AppError::Xml("bib without <mms_id>".into()))?,
            linked_to_cz,
            record: record.ok_or_else(|| AppError::Xml("bib without <record>".into()))?,
            document: xml.to_string(),
        })
    }

    /// The bib document with the current record in place of the original one
    pub fn to_xml(&self) -> AppResult<String> {
        let mut reader = Reader::from_str(&self.document);
        let mut writer = Writer::new(Vec::new());
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) if depth == 1 && e.local_name().as_ref() == b"record" => {
                    let end = e.to_end().into_owned();
                    reader.read_to_end(end.name())?;
                    write_record(&mut writer, &self.record)?;
                }
                Event::Empty(e) if depth == 1 && e.local_name().as_ref() == b"record" => {
                    write_record(&mut writer, &self.record)?;
                }
                Event::Start(e) => {
                    depth += 1;
                    writer.write_event(Event::Start(e))?;
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    writer.write_event(Event::End(e))?;
                }
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| AppError::Xml(e.to_string()))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_record(&self, mms_id: &str) -> AppResult<Bib>;

    /// Save the bib, returning the record as stored
    async fn put_record(&self, bib: &Bib) -> AppResult<Bib>;
}

/// Client for the Alma Bibs API
#[derive(Clone)]
pub struct AlmaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlmaClient {
    pub fn new(region: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://api-{}.hosted.exlibrisgroup.com/almaws/v1", region),
            api_key: api_key.into(),
        }
    }

    fn bib_url(&self, mms_id: &str) -> String {
        format!("{}/bibs/{}", self.base_url, mms_id)
    }
}

#[async_trait]
impl CatalogService for AlmaClient {
    async fn get_record(&self, mms_id: &str) -> AppResult<Bib> {
        tracing::debug!("GET {}", self.bib_url(mms_id));
        let body = self
            .http
            .get(self.bib_url(mms_id))
            .header("Authorization", format!("apikey {}", self.api_key))
            .header("Accept", "application/xml")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let bib = Bib::from_xml(&body)?;
        if bib.mms_id != mms_id {
            return Err(AppError::RecordMismatch {
                requested: mms_id.to_string(),
                returned: bib.mms_id,
            });
        }
        Ok(bib)
    }

    async fn put_record(&self, bib: &Bib) -> AppResult<Bib> {
        let url = self.bib_url(&bib.mms_id);
        tracing::debug!("PUT {}", url);
        let response = self
            .http
            .put(&url)
            .header("Authorization", format!("apikey {}", self.api_key))
            .header("Content-Type", "application/xml")
            .header("Accept", "application/xml")
            .body(bib.to_xml()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Persist {
                status: status.as_u16(),
                body,
            });
        }
        Bib::from_xml(&body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const BIB: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<bib>
  <mms_id>991234567890123</mms_id>
  <linked_record_id type="CZ">9912345</linked_record_id>
  <title>Monstre</title>
  <record>
    <leader>00000cam a2200000 c 4500</leader>
    <controlfield tag="001">991234567890123</controlfield>
    <datafield tag="245" ind1="1" ind2="0">
      <subfield code="a">Monstre og myter</subfield>
    </datafield>
    <datafield tag="650" ind1=" " ind2="7">
      <subfield code="a">Monstre</subfield>
      <subfield code="2">noubomn</subfield>
    </datafield>
  </record>
  <suppress_from_publishing>false</suppress_from_publishing>
</bib>"#;

    #[test]
    fn test_from_xml() {
        let bib = Bib::from_xml(BIB).unwrap();
        assert_eq!(bib.mms_id, "991234567890123");
        assert!(bib.linked_to_cz);
        assert_eq!(bib.record.title().as_deref(), Some("Monstre og myter"));
        assert_eq!(bib.record.data_fields.len(), 2);
    }

    #[test]
    fn test_unlinked_record() {
        let xml = BIB.replace(r#"<linked_record_id type="CZ">9912345</linked_record_id>"#, "");
        assert!(!Bib::from_xml(&xml).unwrap().linked_to_cz);
    }

    #[test]
    fn test_to_xml_replaces_only_the_record() {
        let mut bib = Bib::from_xml(BIB).unwrap();
        bib.record.data_fields[1].set_subfield('a', "Mønstre");

        let xml = bib.to_xml().unwrap();
        assert!(xml.contains("<suppress_from_publishing>false</suppress_from_publishing>"));
        assert!(xml.contains("<title>Monstre</title>"));
        assert!(xml.contains(r#"<subfield code="a">Mønstre</subfield>"#));

        let reread = Bib::from_xml(&xml).unwrap();
        assert_eq!(reread.mms_id, bib.mms_id);
        assert_eq!(reread.record, bib.record);
    }

    #[test]
    fn test_missing_record() {
        assert!(Bib::from_xml("<bib><mms_id>1</mms_id></bib>").is_err());
    }

    #[test]
    fn test_new_bib_serializes() {
        let bib = Bib::from_xml(BIB).unwrap();
        let fresh = Bib::new("991234567890123", bib.record.clone());
        let reread = Bib::from_xml(&fresh.to_xml().unwrap()).unwrap();
        assert_eq!(reread.record, bib.record);
        assert!(!reread.linked_to_cz);
    }
}
