use super::{RecordIter, RecordResult, SiteScope};
use crate::domain::{MetricDetail, MetricFamily};
use serde_json::Value;
use std::iter;

/// One record per `errorType -> count` pair.
pub fn error_response_types(scope: SiteScope<'_>) -> RecordIter<'_> {
    let family = MetricFamily::ErrorResponseTypes;
    match scope.site.family(family.as_str()) {
        None => Box::new(iter::empty()),
        Some(Value::Object(counts)) => {
            Box::new(counts.iter().map(move |(error_type, value)| -> RecordResult {
                Ok(scope.record(MetricDetail::ErrorResponseType {
                    error_type: error_type.clone(),
                    value: value.clone(),
                }))
            }))
        }
        Some(_) => Box::new(iter::once(Err(scope.unexpected_shape(family, "object")))),
    }
}

/// One record per origin server entry; `avgResponseTime` becomes `value`.
pub fn origin_response_time(scope: SiteScope<'_>) -> RecordIter<'_> {
    let family = MetricFamily::OriginResponseTime;
    match scope.site.family(family.as_str()) {
        None => Box::new(iter::empty()),
        Some(Value::Array(entries)) => Box::new(entries.iter().map(move |entry| -> RecordResult {
            Ok(scope.record(MetricDetail::OriginResponseTime {
                value: scope.field(family, entry, "avgResponseTime")?.clone(),
                server: scope.field(family, entry, "server")?.clone(),
                data_center_name: scope.field(family, entry, "dataCenterName")?.clone(),
            }))
        })),
        Some(_) => Box::new(iter::once(Err(scope.unexpected_shape(family, "array")))),
    }
}

/// One record per (region, pop) pair; `valuePerPop` becomes `value`.
pub fn pop_latency(scope: SiteScope<'_>) -> RecordIter<'_> {
    let family = MetricFamily::PopLatency;
    match scope.site.family(family.as_str()) {
        None => Box::new(iter::empty()),
        Some(Value::Array(regions)) => {
            Box::new(regions.iter().flat_map(move |region| region_pops(scope, region)))
        }
        Some(_) => Box::new(iter::once(Err(scope.unexpected_shape(family, "array")))),
    }
}

fn region_pops<'a>(scope: SiteScope<'a>, region_entry: &'a Value) -> RecordIter<'a> {
    let family = MetricFamily::PopLatency;
    let region = match scope.field(family, region_entry, "region") {
        Ok(region) => region,
        Err(e) => return Box::new(iter::once(Err(e))),
    };

    // A region without pops contributes nothing.
    match region_entry.get("pops") {
        None | Some(Value::Null) => Box::new(iter::empty()),
        Some(Value::Array(pops)) => Box::new(pops.iter().map(move |pop_entry| -> RecordResult {
            Ok(scope.record(MetricDetail::PopLatency {
                value: scope.field(family, pop_entry, "valuePerPop")?.clone(),
                region: region.clone(),
                pop: scope.field(family, pop_entry, "pop")?.clone(),
            }))
        })),
        Some(_) => Box::new(iter::once(Err(scope.unexpected_shape(family, "array of pops")))),
    }
}
