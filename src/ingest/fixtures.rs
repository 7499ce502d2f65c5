/// Test fixtures: representative JSON payloads from the USGS IV API.
///
/// Structurally complete but truncated to a handful of readings. They reflect
/// the WaterML-as-JSON envelope returned by:
///   https://waterservices.usgs.gov/nwis/iv/?format=json&startDT=...&endDT=...
///
/// USGS IV response shape:
///   response.value.timeSeries[]
///     .sourceInfo.siteCode[0].value  - site number (string)
///     .sourceInfo.siteName
///     .variable.variableCode[0].value - parameter code (string)
///     .variable.unit.unitCode
///     .variable.noDataValue          - sentinel for missing data (-999999)
///     .values[0].value[]
///       .value     - the measurement as a STRING, sometimes non-numeric ("Ice")
///       .dateTime  - ISO 8601 with offset
///       .qualifiers[]

/// Little Falls (01646500) discharge over 90 minutes, with one sentinel and
/// one ice-affected reading, followed by a gage height series for the same
/// site.
pub(crate) fn fixture_potomac_window_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "POTOMAC RIVER NEAR WASH, DC LITTLE FALLS PUMP STA",
              "siteCode": [{ "value": "01646500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "variableName": "Streamflow, ft&#179;/s",
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "8120", "qualifiers": ["P"], "dateTime": "2024-05-01T08:00:00.000-04:00" },
                { "value": "8150", "qualifiers": ["P"], "dateTime": "2024-05-01T08:15:00.000-04:00" },
                { "value": "-999999", "qualifiers": ["P"], "dateTime": "2024-05-01T08:30:00.000-04:00" },
                { "value": "8210", "qualifiers": ["P"], "dateTime": "2024-05-01T08:45:00.000-04:00" },
                { "value": "Ice", "qualifiers": ["P", "Ice"], "dateTime": "2024-05-01T09:00:00.000-04:00" },
                { "value": "8300", "qualifiers": ["P"], "dateTime": "2024-05-01T09:15:00.000-04:00" },
                { "value": "8340", "qualifiers": ["P"], "dateTime": "2024-05-01T09:30:00.000-04:00" }
              ],
              "qualifier": [{ "qualifierCode": "P", "qualifierDescription": "Provisional data subject to revision." }]
            }]
          },
          {
            "sourceInfo": {
              "siteName": "POTOMAC RIVER NEAR WASH, DC LITTLE FALLS PUMP STA",
              "siteCode": [{ "value": "01646500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00065", "network": "NWIS" }],
              "variableName": "Gage height, ft",
              "unit": { "unitCode": "ft" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "3.41", "qualifiers": ["P"], "dateTime": "2024-05-01T08:00:00.000-04:00" }
              ],
              "qualifier": []
            }]
          }
        ]
      }
    }"#
}

/// Two discharge sites in one response.
pub(crate) fn fixture_multi_site_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "POTOMAC RIVER NEAR WASH, DC LITTLE FALLS PUMP STA",
              "siteCode": [{ "value": "01646500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "8120", "qualifiers": ["P"], "dateTime": "2024-05-01T08:00:00.000-04:00" }
              ]
            }]
          },
          {
            "sourceInfo": {
              "siteName": "ROCK CREEK AT SHERRILL DRIVE WASHINGTON, DC",
              "siteCode": [{ "value": "01648000", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "41.2", "qualifiers": ["A"], "dateTime": "2024-05-01T08:00:00.000-04:00" },
                { "value": "40.8", "qualifiers": ["A"], "dateTime": "2024-05-01T08:15:00.000-04:00" }
              ]
            }]
          }
        ]
      }
    }"#
}

/// Site with an empty value array (sensor outage for the whole window).
pub(crate) fn fixture_empty_value_array_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "ANACOSTIA RIVER NW BR NEAR COLESVILLE, MD",
              "siteCode": [{ "value": "01650500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{ "value": [], "qualifier": [] }]
          }
        ]
      }
    }"#
}

/// A reading whose dateTime is not ISO 8601.
pub(crate) fn fixture_bad_timestamp_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "POTOMAC RIVER NEAR WASH, DC LITTLE FALLS PUMP STA",
              "siteCode": [{ "value": "01646500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "8120", "qualifiers": ["P"], "dateTime": "05/01/2024 08:00" }
              ]
            }]
          }
        ]
      }
    }"#
}

/// Readings out of chronological order.
pub(crate) fn fixture_out_of_order_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "POTOMAC RIVER NEAR WASH, DC LITTLE FALLS PUMP STA",
              "siteCode": [{ "value": "01646500", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "8150", "qualifiers": ["P"], "dateTime": "2024-05-01T08:15:00.000-04:00" },
                { "value": "8120", "qualifiers": ["P"], "dateTime": "2024-05-01T08:00:00.000-04:00" }
              ]
            }]
          }
        ]
      }
    }"#
}
