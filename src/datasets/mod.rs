// src/datasets/mod.rs
//
// The four pipeline definitions. Everything dataset-specific lives here:
// source URLs, time-slice ranges, field projections, output naming.

use chrono::Utc;

use crate::config::Config;
use crate::pipeline::{Dataset, Slice};
use crate::transform::{recode, FieldMapping, FieldSpec, PayloadShape, Recode, SourceField};

const TREASURY_BASE: &str =
    "https://api.fiscaldata.treasury.gov/services/api/fiscal_service/v2/accounting/od/title_xii";
const HISTPOV_BASE: &str = "https://api.census.gov/data/timeseries/poverty/histpov2";
const SAIPE_BASE: &str = "https://api.census.gov/data/timeseries/poverty/saipe";

const PAGE_SIZE: u32 = 10_000;

/// All configured datasets, in run order.
pub fn all(config: &Config) -> Vec<Dataset> {
    vec![
        treasury_full_extract(),
        treasury_fiscal_interest(),
        natl_poverty(config),
        small_area_poverty(config),
    ]
}

fn key_fields(pairs: &[(&'static str, &'static str)]) -> Vec<FieldMapping> {
    pairs
        .iter()
        .map(|&(source, output)| FieldMapping {
            source: SourceField::Key(source),
            output,
        })
        .collect()
}

fn index_fields(outputs: &[&'static str]) -> Vec<FieldMapping> {
    outputs
        .iter()
        .enumerate()
        .map(|(idx, &output)| FieldMapping {
            source: SourceField::Index(idx),
            output,
        })
        .collect()
}

fn treasury_spec() -> FieldSpec {
    FieldSpec {
        shape: PayloadShape::DataKey("data"),
        fields: key_fields(&[
            ("record_date", "Record Date"),
            ("state_nm", "State"),
            ("interest_rate_pct", "Interest Rate Percent"),
            ("record_fiscal_year", "Record Fiscal Year"),
            ("record_fiscal_quarter", "Record Fiscal Quarter"),
            ("record_calendar_year", "Record Calendar Year"),
            // upstream calls this the calendar quarter; the published header
            // has always said month
            ("record_calendar_quarter", "Record Calendar Month"),
        ]),
        recode: None,
    }
}

fn census_url(base: &str, get: &str, for_clause: &str, year: i32, key: Option<&str>) -> String {
    let mut url = format!("{base}?get={get}&for={for_clause}&time={year}");
    if let Some(key) = key {
        url.push_str("&key=");
        url.push_str(key);
    }
    url
}

/// Two-page full dump of the Title XII interest-rate dataset, written
/// locally with a run-timestamped filename. Not published.
pub fn treasury_full_extract() -> Dataset {
    let stamp = Utc::now().timestamp();
    let slices = (1..=2)
        .map(|page| Slice {
            id: format!("page-{page}"),
            url: format!(
                "{TREASURY_BASE}?page%5Bnumber%5D={page}&page%5Bsize%5D={PAGE_SIZE}"
            ),
            filename: format!("fiscal_{stamp}_page{page}.csv"),
        })
        .collect();

    Dataset {
        name: "treasury-full-extract",
        subdir: "fiscal-data",
        key_prefix: "us-treasury-financial-data",
        publish: false,
        spec: treasury_spec(),
        slices,
    }
}

/// One slice per calendar year of Title XII interest-rate records.
pub fn treasury_fiscal_interest() -> Dataset {
    let slices = (2016..=2022)
        .map(|year: i32| Slice {
            id: year.to_string(),
            url: format!(
                "{TREASURY_BASE}?filter=record_calendar_year:in:({year})&page%5Bnumber%5D=1&page%5Bsize%5D={PAGE_SIZE}"
            ),
            filename: format!("treasury-fiscal-interest-data_{year}.csv"),
        })
        .collect();

    Dataset {
        name: "treasury-fiscal-interest",
        subdir: "treasury-data",
        key_prefix: "us-treasury-financial-data",
        publish: true,
        spec: treasury_spec(),
        slices,
    }
}

/// National poverty rate by race/ethnicity, one slice per year. The RACE
/// code column is recoded to the Census legend labels.
pub fn natl_poverty(config: &Config) -> Dataset {
    let key = config.census_key.as_deref();
    let slices = (1959..=2020)
        .map(|year| Slice {
            id: year.to_string(),
            url: census_url(HISTPOV_BASE, "NAME,PCTPOV,YEAR,RACE", "us:*", year, key),
            filename: format!("poverty-rate_natl_{year}.csv"),
        })
        .collect();

    Dataset {
        name: "natl-poverty",
        subdir: "natl-poverty-data",
        key_prefix: "us-census-natl-poverty-data",
        publish: true,
        spec: FieldSpec {
            shape: PayloadShape::HeaderRows,
            fields: index_fields(&[
                "Country",
                "Percent Population in Poverty",
                "Year",
                "Race / Ethnicity",
            ]),
            recode: Some(Recode {
                field: "Race / Ethnicity",
                lookup: recode::race_label,
            }),
        },
        slices,
    }
}

/// Small-area (state-level) poverty estimates, one slice per year.
pub fn small_area_poverty(config: &Config) -> Dataset {
    let key = config.census_key.as_deref();
    let slices = (2000..=2016)
        .map(|year| Slice {
            id: year.to_string(),
            url: census_url(
                SAIPE_BASE,
                "NAME,SAEPOVALL_PT,SAEPOVALL_MOE,SAEPOVRTALL_MOE,SAEPOVRTALL_PT",
                "state:*",
                year,
                key,
            ),
            filename: format!("poverty_small-area_{year}.csv"),
        })
        .collect();

    Dataset {
        name: "small-area-poverty",
        subdir: "small-area-poverty-data",
        key_prefix: "us-census-small-area-poverty-data",
        publish: true,
        spec: FieldSpec {
            shape: PayloadShape::HeaderRows,
            fields: index_fields(&[
                "State",
                "Population in Poverty",
                "Population in Poverty (Margin of Error)",
                "Poverty Rate (Rate Estimate)",
                "Year",
            ]),
            recode: None,
        },
        slices,
    }
}
