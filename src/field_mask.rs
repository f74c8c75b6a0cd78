//! Whitelisted column projection for partial (field-masked) reads.
//!
//! Every entity declares one `AllowList` constant. Requested names are matched
//! against it, so nothing that is not a compile-time column literal can reach
//! the SQL text.

use serde::Deserialize;

/// Closed set of selectable columns for one table. The first column is the
/// identifier and is always part of a projection.
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    columns: &'static [&'static str],
}

impl AllowList {
    pub const fn new(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }

    pub fn id_column(&self) -> &'static str {
        self.columns.first().copied().unwrap_or("id")
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| *c == name)
    }

    /// Resolves requested names to a projection.
    ///
    /// Unknown names are dropped silently, duplicates collapse, the result
    /// follows allow-list order and always contains the id column. When no
    /// requested name survives, every column is selected.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Projection {
        let wanted: Vec<&str> = requested
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| self.contains(s))
            .collect();

        if wanted.is_empty() {
            return Projection {
                columns: self.columns.to_vec(),
            };
        }

        let id = self.id_column();
        let columns = self
            .columns
            .iter()
            .copied()
            .filter(|c| *c == id || wanted.contains(c))
            .collect();
        Projection { columns }
    }
}

/// A resolved, non-empty column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<&'static str>,
}

impl Projection {
    #[cfg(test)]
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    #[cfg(test)]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| *c == column)
    }

    /// Comma separated, double-quoted column list for a `SELECT`.
    pub fn to_sql(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `?fields=a,b,c` on detail routes.
#[derive(Debug, Default, Deserialize)]
pub struct FieldsQuery {
    pub fields: Option<String>,
}

impl FieldsQuery {
    pub fn names(&self) -> Vec<String> {
        parse_field_list(self.fields.as_deref())
    }
}

/// Splits a `fields=a,b,c` query value into names; blank entries are skipped.
pub fn parse_field_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: AllowList = AllowList::new(&["id", "name", "address", "image_file_name"]);

    #[test]
    fn empty_request_selects_everything() {
        let p = LIST.resolve::<&str>(&[]);
        assert_eq!(p.columns(), &["id", "name", "address", "image_file_name"]);
    }

    #[test]
    fn id_is_always_included() {
        let p = LIST.resolve(&["address"]);
        assert_eq!(p.columns(), &["id", "address"]);
    }

    #[test]
    fn unknown_names_are_dropped() {
        let with_junk = LIST.resolve(&["name", "password; DROP TABLE users", "nope"]);
        let clean = LIST.resolve(&["name"]);
        assert_eq!(with_junk, clean);
    }

    #[test]
    fn only_unknown_names_fall_back_to_all_columns() {
        let p = LIST.resolve(&["nope", "1=1"]);
        assert_eq!(p, LIST.resolve::<&str>(&[]));
    }

    #[test]
    fn resolution_is_idempotent_and_order_insensitive() {
        let twice = LIST.resolve(&["name", "name", "address"]);
        let once = LIST.resolve(&["address", "name"]);
        assert_eq!(twice, once);
        assert_eq!(once.columns(), &["id", "name", "address"]);
    }

    #[test]
    fn requesting_only_id_selects_only_id() {
        assert_eq!(LIST.resolve(&["id"]).columns(), &["id"]);
    }

    #[test]
    fn sql_quotes_every_column() {
        assert_eq!(LIST.resolve(&["name"]).to_sql(), "\"id\", \"name\"");
    }

    #[test]
    fn parses_comma_separated_fields() {
        assert_eq!(
            parse_field_list(Some("name, address,,")),
            vec!["name".to_string(), "address".to_string()]
        );
        assert!(parse_field_list(None).is_empty());
    }
}
