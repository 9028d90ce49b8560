//! Washington DC Metropolitan Police Department crime incident dataset.
//!
//! Accepts the open-data `GeoJSON` download (`features[].properties`), the
//! `ArcGIS` REST query response (`features[].attributes`), and a bare array
//! of flattened records.

use crime_insights_incident_models::NewIncident;
use serde::Deserialize;
use serde_json::Value;

use crate::IngestError;
use crate::parsing::{text, timestamp};

/// `GeoJSON` export of the current-year crime incidents layer.
pub const DEFAULT_DATASET_URL: &str = "https://opendata.dc.gov/api/download/v1/items/74d924ddc3374e3b977e6f002478cb9b/geojson?layers=7";

/// Raw record from the DC feeds. Values stay untyped until normalized.
#[derive(Debug, Default, Deserialize)]
struct Record {
    #[serde(default, alias = "OFFENSE")]
    offense: Option<Value>,
    #[serde(default, alias = "REPORT_DAT")]
    report_dat: Option<Value>,
    #[serde(default, alias = "START_DATE")]
    start_date: Option<Value>,
    #[serde(default, alias = "END_DATE")]
    end_date: Option<Value>,
    #[serde(default, alias = "SHIFT")]
    shift: Option<Value>,
    #[serde(default, alias = "METHOD")]
    method: Option<Value>,
    #[serde(default, alias = "WARD")]
    ward: Option<Value>,
    #[serde(default, alias = "PSA")]
    psa: Option<Value>,
    #[serde(default, alias = "NEIGHBORHOOD_CLUSTER")]
    neighborhood_cluster: Option<Value>,
}

impl Record {
    fn into_incident(self) -> NewIncident {
        let report_dat = timestamp(self.report_dat.as_ref());
        if report_dat.is_none() && self.report_dat.as_ref().is_some_and(|v| !v.is_null()) {
            log::debug!("Unparseable REPORT_DAT: {:?}", self.report_dat);
        }

        NewIncident {
            offense: text(self.offense.as_ref()),
            report_dat,
            start_date: timestamp(self.start_date.as_ref()),
            end_date: timestamp(self.end_date.as_ref()),
            shift: text(self.shift.as_ref()),
            method: text(self.method.as_ref()),
            ward: text(self.ward.as_ref()),
            psa: text(self.psa.as_ref()),
            neighborhood_cluster: text(self.neighborhood_cluster.as_ref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default, alias = "attributes")]
    properties: Option<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Dataset {
    Collection { features: Vec<Feature> },
    Records(Vec<Record>),
}

/// Parses a DC dataset document into incidents.
///
/// A feature without properties still yields an incident with every
/// field empty, so record counts match the source.
///
/// # Errors
///
/// * If `json` is not one of the accepted document shapes
pub fn parse_dataset(json: &str) -> Result<Vec<NewIncident>, IngestError> {
    let records: Vec<Record> = match serde_json::from_str(json)? {
        Dataset::Collection { features } => features
            .into_iter()
            .map(|f| f.properties.unwrap_or_default())
            .collect(),
        Dataset::Records(records) => records,
    };

    let raw_count = records.len();
    let incidents: Vec<NewIncident> = records.into_iter().map(Record::into_incident).collect();
    let undated = incidents.iter().filter(|i| i.report_dat.is_none()).count();

    log::info!("Parsed {raw_count} incidents ({undated} without REPORT_DAT)");
    Ok(incidents)
}
