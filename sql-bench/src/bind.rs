//! Query rewrite and positional parameter binding.
//!
//! Parameters come from `p1..pN` configuration entries written as
//! `<type>:<value>` or a bare value. They are parsed once before the trial
//! loop and bound once onto the prepared statement.

use crate::config::BenchmarkConfig;
use crate::driver::Statement;
use crate::error::BenchError;
use bench_core::string_operations::count_occurrences;
use log::{info, warn};
use std::fmt;

/// Row cap appended to every `select` so repeated trials stay bounded.
pub const QUERY_SELECT_LIMIT: usize = 137;

/// Strips `;` from `select` queries and caps them with a `LIMIT` clause.
/// Any other statement is returned untouched.
pub fn rewrite_query(query: &str) -> String {
    if query.trim().to_lowercase().starts_with("select") {
        format!("{} LIMIT {}", query.replace(';', ""), QUERY_SELECT_LIMIT)
    } else {
        query.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Opaque value; the driver decides how to convert it.
    Object,
    /// Character string.
    String,
    /// National character string.
    NString,
}

impl ParamType {
    /// Case-insensitive lookup of a type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("object") {
            Some(ParamType::Object)
        } else if tag.eq_ignore_ascii_case("string") {
            Some(ParamType::String)
        } else if tag.eq_ignore_ascii_case("nstring") {
            Some(ParamType::NString)
        } else {
            None
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ParamType::Object => "object",
            ParamType::String => "string",
            ParamType::NString => "nstring",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParameter {
    /// 1-based placeholder position.
    pub index: usize,
    pub kind: ParamType,
    pub value: String,
}

impl BoundParameter {
    /// Parses a raw `<type>:<value>` entry. Without a colon the whole entry
    /// is the value and the type is `object`; an unknown type falls back to
    /// `object` with a warning.
    pub fn parse(index: usize, raw: &str) -> Self {
        let Some((tag, value)) = raw.split_once(':') else {
            return Self {
                index,
                kind: ParamType::Object,
                value: raw.to_string(),
            };
        };

        let kind = ParamType::from_tag(tag).unwrap_or_else(|| {
            warn!("Unknown type {} for p{}, binding as object", tag, index);
            ParamType::Object
        });
        Self {
            index,
            kind,
            value: value.to_string(),
        }
    }
}

/// Resolves one parameter per `?` in `query`, stopping at the first missing
/// `pN`. Placeholders after the gap stay unbound.
pub fn resolve_parameters(query: &str, config: &BenchmarkConfig) -> Vec<BoundParameter> {
    let placeholders = count_occurrences(query, '?');
    let mut bound = Vec::with_capacity(placeholders);

    for index in 1..=placeholders {
        let Some(raw) = config.param(index) else {
            break;
        };
        info!("p{} = {}", index, raw);
        bound.push(BoundParameter::parse(index, raw));
    }

    if bound.len() < placeholders {
        info!(
            "{} of {} placeholders bound, p{} is not configured",
            bound.len(),
            placeholders,
            bound.len() + 1
        );
    }
    bound
}

/// Applies resolved parameters to a prepared statement.
pub fn apply_parameters(
    statement: &mut dyn Statement,
    params: &[BoundParameter],
) -> Result<(), BenchError> {
    for param in params {
        statement
            .bind(param)
            .map_err(|source| BenchError::Bind {
                index: param.index,
                source,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::properties::Properties;

    fn config_with(params: &[(&str, &str)]) -> BenchmarkConfig {
        let mut props: Properties = [
            ("url", ":memory:"),
            ("driver", "sqlite"),
            ("query", "select 1"),
        ]
        .into_iter()
        .collect();
        for (k, v) in params {
            props.set(*k, *v);
        }
        BenchmarkConfig::from_properties(&props).unwrap()
    }

    #[test]
    fn select_is_capped_and_semicolons_removed() {
        assert_eq!(
            rewrite_query("select * from t;"),
            "select * from t LIMIT 137"
        );
        assert_eq!(
            rewrite_query("  SeLeCt a; from t;;"),
            "  SeLeCt a from t LIMIT 137"
        );
    }

    #[test]
    fn non_select_is_untouched() {
        for q in ["update t set a = 1;", "with x as (select 1) select * from x;", ""] {
            assert_eq!(rewrite_query(q), q);
        }
    }

    #[test]
    fn type_tags_are_case_insensitive() {
        for raw in ["STRING:x", "string:x", "String:x"] {
            let p = BoundParameter::parse(1, raw);
            assert_eq!(p.kind, ParamType::String);
            assert_eq!(p.value, "x");
        }
        assert_eq!(BoundParameter::parse(1, "NString:y").kind, ParamType::NString);
        assert_eq!(BoundParameter::parse(1, "OBJECT:z").kind, ParamType::Object);
    }

    #[test]
    fn bare_value_binds_as_object() {
        let p = BoundParameter::parse(3, "42");
        assert_eq!(
            p,
            BoundParameter {
                index: 3,
                kind: ParamType::Object,
                value: "42".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_falls_back_to_object() {
        let p = BoundParameter::parse(2, "timestamp:2013-01-01");
        assert_eq!(p.kind, ParamType::Object);
        assert_eq!(p.value, "2013-01-01");
    }

    #[test]
    fn only_first_colon_splits() {
        let p = BoundParameter::parse(1, "string:a:b");
        assert_eq!(p.kind, ParamType::String);
        assert_eq!(p.value, "a:b");
    }

    #[test]
    fn binding_stops_at_first_missing_key() {
        let config = config_with(&[("p1", "string:a"), ("p2", "b"), ("p4", "d")]);
        let params = resolve_parameters("select ? , ?, ?, ? from t", &config);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].index, 1);
        assert_eq!(params[1].index, 2);
        assert_eq!(params[1].value, "b");
    }

    #[test]
    fn extra_params_beyond_placeholders_are_ignored() {
        let config = config_with(&[("p1", "a"), ("p2", "b")]);
        let params = resolve_parameters("select * from t where a = ?", &config);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn no_placeholders_binds_nothing() {
        let config = config_with(&[("p1", "a")]);
        assert!(resolve_parameters("select 1", &config).is_empty());
    }
}
