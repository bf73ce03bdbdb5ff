use regex::Regex;

use crate::error::{Error, Result};

/// What a `SELECT` asks to see: either the row count or a named list
/// of columns, read left to right in the order the statement gave
/// them (duplicates and repeats are preserved verbatim).
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    CountStar,
    Columns(Vec<String>),
}

/// A parsed `WHERE <column> = '<literal>'` clause. Only equality
/// against a single column is accepted; anything else is a parse
/// error rather than a silently-ignored filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFilter {
    pub column: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub projection: Projection,
    pub filter: Option<ValueFilter>,
}

peg::parser! {
    grammar grammar_rules() for str {
        rule _() = quiet!{[' ' | '\t' | '\n' | '\r']*}

        rule kw_select() = "SELECT" / "select" / "Select"
        rule kw_from() = "FROM" / "from" / "From"
        rule kw_where() = "WHERE" / "where" / "Where"
        rule kw_count() = "COUNT" / "count" / "Count"

        rule bare_ident() -> String
            = s:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']*) { s.to_string() }

        rule quoted_ident() -> String
            = "\"" s:$((!['"'] [_])*) "\"" { s.to_string() }
            / "`" s:$((!['`'] [_])*) "`" { s.to_string() }
            / "[" s:$((![']'] [_])*) "]" { s.to_string() }

        rule ident() -> String = quoted_ident() / bare_ident()

        rule string_literal() -> String
            = "'" s:$((!['\''] [_])*) "'" { s.to_string() }

        rule count_star() -> Projection
            = kw_count() _ "(" _ "*" _ ")" { Projection::CountStar }

        rule column_list() -> Projection
            = cs:(ident() ** (_ "," _)) { Projection::Columns(cs) }

        rule projection() -> Projection = count_star() / column_list()

        rule filter() -> ValueFilter
            = kw_where() _ col:ident() _ "=" _ lit:string_literal() {
                ValueFilter { column: col, literal: lit }
            }

        pub rule select_stmt() -> SelectQuery
            = _ kw_select() _ p:projection() _ kw_from() _ t:ident() _ f:filter()? _ {
                SelectQuery { table: t, projection: p, filter: f }
            }
    }
}

/// Parses a `SELECT` statement of the supported shape: a single
/// projection (either `COUNT(*)` or a comma-separated column list)
/// over one table, with an optional `WHERE col = 'literal'` clause.
pub fn parse_select(sql: &str) -> Result<SelectQuery> {
    grammar_rules::select_stmt(sql).map_err(|e| Error::query(format!("cannot parse SELECT statement: {e}")))
}

const CONSTRAINT_KEYWORDS: &[&str] = &["PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "CONSTRAINT"];

/// Matches the first identifier-shaped run of characters in a
/// column-def fragment. Any surrounding `"..."`/`` `...` ``/`[...]`
/// quoting is simply skipped over rather than parsed, since none of
/// those quote characters are themselves identifier characters.
fn leading_ident_regex() -> Regex {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap()
}

/// Extracts column names, in declaration order, from a `CREATE TABLE`
/// statement's SQL text as stored in `sqlite_schema.sql`. Table-level
/// constraints (`PRIMARY KEY (...)`, `FOREIGN KEY (...)`, ...) are
/// skipped rather than misread as columns; quoted identifiers
/// (`"col"`, `` `col` ``, `[col]`) and an `AUTOINCREMENT` qualifier on
/// the rowid column are handled the same way sqlite's own shell
/// prints them back.
pub fn columns_from_create_table(sql: &str) -> Result<Vec<String>> {
    let open = sql.find('(').ok_or_else(|| Error::query("CREATE TABLE statement has no column list"))?;
    let close = sql.rfind(')').ok_or_else(|| Error::query("CREATE TABLE statement has no column list"))?;
    if close <= open {
        return Err(Error::query("CREATE TABLE statement has a malformed column list"));
    }
    let body = &sql[open + 1..close];

    let mut columns = Vec::new();
    for segment in split_top_level_commas(body) {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        let first_word_upper = trimmed.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        if CONSTRAINT_KEYWORDS.contains(&first_word_upper.as_str()) {
            continue;
        }
        let name = leading_ident_regex()
            .find(trimmed)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::query(format!("cannot find a column name in `{trimmed}`")))?;
        columns.push(name);
    }
    Ok(columns)
}

/// Splits on commas that aren't nested inside parentheses, so a
/// column definition like `FOREIGN KEY(a, b) REFERENCES t(a, b)`
/// stays one segment instead of four.
fn split_top_level_commas(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}
